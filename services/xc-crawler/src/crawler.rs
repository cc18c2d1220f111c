//!
//! src/crawler.rs  xc-crawler  Oct 19th, 2026
//!
//! Defines the crawler pipeline: page through the search api, write the
//! recording table, then download the audio it lists
//!

use std::path::PathBuf;
use std::time::Duration;

use futures::{stream, Stream, StreamExt};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::download::{AudioDownloader, DownloadReport};
use crate::errors::CrawlerError;
use crate::fetch::{FileClient, XenoCantoClient};
use crate::table;
use crate::types::{Recording, SearchPage};

/// Result of draining the page stream. `pages_requested` counts the failed
/// request too, `error` holds whatever stopped pagination early and the
/// records gathered before it are kept.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub recordings: Vec<Recording>,
    pub pages_requested: u32,
    pub error: Option<CrawlerError>,
}

pub struct RecordingFetcher {
    client: XenoCantoClient,
    page_delay: Duration,
}

impl RecordingFetcher {
    pub fn new(client: XenoCantoClient, page_delay: Duration) -> Self {
        Self { client, page_delay }
    }

    ///
    /// Lazy stream of result pages for `query`, starting at page 1. Ends
    /// after the last reported page, after `max_pages`, or right after
    /// yielding the first error.
    ///
    pub fn pages<'a>(&'a self, query: &'a str, max_pages: u32) ->
        impl Stream<Item = Result<SearchPage, CrawlerError>> + 'a {
        let max_pages = max_pages.max(1);
        stream::unfold(Some(1_u32), move |next| async move {
            let Some(page) = next else { return None };
            if page > 1 {
                sleep(self.page_delay).await;
            }
            match self.client.search_page(query, page).await {
                Ok(result) => {
                    info!(page, num_pages = result.num_pages, "fetch.page");
                    let more = page < result.num_pages && page < max_pages;
                    Some((Ok(result), more.then_some(page + 1)))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Drains `pages`, never fails: an error ends pagination and is returned
    /// alongside the partial result
    pub async fn fetch_recordings(&self, query: &str, max_pages: u32) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut pages = std::pin::pin!(self.pages(query, max_pages));

        while let Some(result) = pages.next().await {
            outcome.pages_requested += 1;
            match result {
                Ok(page) => outcome.recordings.extend(page.into_recordings()),
                Err(e) => {
                    warn!(page = outcome.pages_requested, error = %e, "fetch.abort");
                    outcome.error = Some(e);
                }
            }
        }

        info!(
            pages = outcome.pages_requested,
            recordings = outcome.recordings.len(),
            "fetch.done"
        );
        outcome
    }
}

/// Arguments of one crawl
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub query: String,
    pub max_pages: u32,
    pub filename: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub struct CrawlSummary {
    pub fetch: FetchOutcome,
    pub table: PathBuf,
    pub downloads: DownloadReport,
}

impl CrawlSummary {
    /// Closing report, per-page and per-file warnings are already logged
    pub fn log(&self) {
        info!(
            recordings = self.fetch.recordings.len(),
            table = %self.table.display(),
            saved = self.downloads.saved,
            total = self.downloads.total,
            partial = self.fetch.error.is_some(),
            "crawler.summary"
        );
        for failure in &self.downloads.failures {
            info!(file = %failure.file_name, "crawler.summary.failed");
        }
    }
}

pub struct Crawler {
    fetcher: RecordingFetcher,
    downloader: AudioDownloader,
}

impl Crawler {
    pub fn new(cfg: &AppConfig) -> Result<Self, CrawlerError> {
        let api   = XenoCantoClient::new(&cfg.http, &cfg.xeno_canto)?;
        let files = FileClient::new(&cfg.http, &cfg.xeno_canto)?;
        Ok( Self::from_parts(
            RecordingFetcher::new(api, cfg.xeno_canto.page_delay),
            AudioDownloader::new(files)
        ))
    }

    pub fn from_parts(fetcher: RecordingFetcher, downloader: AudioDownloader) -> Self {
        Self { fetcher, downloader }
    }

    ///
    /// Runs fetch -> write -> download in order. Only table write/read
    /// failures are returned as errors.
    ///
    pub async fn run(&self, request: &CrawlRequest) -> Result<CrawlSummary, CrawlerError> {
        info!(query = %request.query, max_pages = request.max_pages, "crawler.start");

        let fetch = self.fetcher
            .fetch_recordings(&request.query, request.max_pages)
            .await;

        let table = table::write_recordings(&fetch.recordings, &request.filename)?;

        let downloads = self.downloader
            .download_all(&table, &request.output_dir)
            .await?;

        info!(
            pages = fetch.pages_requested,
            recordings = fetch.recordings.len(),
            saved = downloads.saved,
            failed = downloads.failures.len(),
            "crawler.exit"
        );
        Ok( CrawlSummary { fetch, table, downloads } )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, XenoCantoConfig};
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn xc_config(server: &MockServer) -> XenoCantoConfig {
        XenoCantoConfig {
            base_url: Url::parse(&format!("{}/api/2/recordings", server.uri())).unwrap(),
            user_agent: "xc-crawler-test".to_string(),
            page_delay: Duration::ZERO,
        }
    }

    fn fetcher(server: &MockServer) -> RecordingFetcher {
        let cfg = xc_config(server);
        let client = XenoCantoClient::new(&HttpConfig::default(), &cfg).unwrap();
        RecordingFetcher::new(client, cfg.page_delay)
    }

    /// Shared sink for a test-scoped fmt subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn page_body(page: u32, num_pages: u32, per_page: u32) -> serde_json::Value {
        let recordings: Vec<_> = (0..per_page)
            .map(|i| json!({ "id": format!("{page}-{i}") }))
            .collect();
        json!({ "numPages": num_pages, "page": page, "recordings": recordings })
    }

    async fn mount_pages(server: &MockServer, num_pages: u32, expected: &[u32]) {
        for page in 1..=num_pages {
            let hits: u64 = if expected.contains(&page) { 1 } else { 0 };
            Mock::given(method("GET"))
                .and(path("/api/2/recordings"))
                .and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200)
                    .set_body_json(page_body(page, num_pages, 2)))
                .expect(hits)
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn stops_at_max_pages() {
        let server = MockServer::start().await;
        mount_pages(&server, 5, &[1, 2]).await;

        let outcome = fetcher(&server).fetch_recordings("gen:turdus", 2).await;

        assert_eq!(outcome.pages_requested, 2);
        assert_eq!(outcome.recordings.len(), 4);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn stops_at_reported_page_count() {
        let server = MockServer::start().await;
        mount_pages(&server, 3, &[1, 2, 3]).await;

        let outcome = fetcher(&server).fetch_recordings("gen:turdus", 10).await;

        assert_eq!(outcome.pages_requested, 3);
        let ids: Vec<_> = outcome.recordings.iter().filter_map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["1-0", "1-1", "2-0", "2-1", "3-0", "3-1"]);
    }

    #[tokio::test]
    async fn pages_are_spaced_by_delay() {
        let server = MockServer::start().await;
        mount_pages(&server, 3, &[1, 2, 3]).await;

        let delay = Duration::from_millis(200);
        let cfg = xc_config(&server);
        let client = XenoCantoClient::new(&HttpConfig::default(), &cfg).unwrap();
        let fetcher = RecordingFetcher::new(client, delay);

        let started = Instant::now();
        let outcome = fetcher.fetch_recordings("gen:turdus", 3).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.pages_requested, 3);
        // two pauses, none ahead of page 1
        assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 3, "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn zero_delay_does_not_pause() {
        let server = MockServer::start().await;
        mount_pages(&server, 3, &[1, 2, 3]).await;

        let started = Instant::now();
        let outcome = fetcher(&server).fetch_recordings("gen:turdus", 3).await;

        assert_eq!(outcome.pages_requested, 3);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn empty_result_makes_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numRecordings": "0", "numPages": 0, "page": 1, "recordings": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_recordings("gen:nothing", 3).await;
        assert_eq!(outcome.pages_requested, 1);
        assert!(outcome.recordings.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn error_keeps_partial_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 4, 3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(3, 4, 3)))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_recordings("gen:turdus", 4).await;

        assert_eq!(outcome.pages_requested, 2);
        assert_eq!(outcome.recordings.len(), 3);
        assert!(matches!(outcome.error, Some(CrawlerError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn malformed_page_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "busy" })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_recordings("gen:turdus", 2).await;
        assert_eq!(outcome.pages_requested, 1);
        assert!(outcome.recordings.is_empty());
        assert!(matches!(outcome.error, Some(CrawlerError::Parse(_))));
    }

    #[tokio::test]
    async fn page_stream_is_restartable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1, 1)))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        let first: Vec<_> = fetcher.pages("gen:turdus", 3).collect().await;
        let second: Vec<_> = fetcher.pages("gen:turdus", 3).collect().await;
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn full_crawl_writes_table_and_audio() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/api/2/recordings"))
            .and(query_param("query", "gen:turdus sp:merula"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numPages": 1,
                "recordings": [
                    {
                        "id": "1", "gen": "Turdus", "sp": "merula",
                        "file": format!("{}/1/download", server.uri()),
                        "file-name": "XC1.mp3",
                        "also": ["Parus major", "Erithacus rubecula"]
                    },
                    {
                        "id": "2", "gen": "Turdus", "sp": "merula",
                        "file": format!("{}/2/download", server.uri()),
                        "file-name": "XC2.mp3"
                    }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"one".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2/download"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cfg = xc_config(&server);
        let http = HttpConfig::default();
        let crawler = Crawler::from_parts(
            RecordingFetcher::new(XenoCantoClient::new(&http, &cfg).unwrap(), cfg.page_delay),
            AudioDownloader::new(FileClient::new(&http, &cfg).unwrap())
        );
        let request = CrawlRequest {
            query: "gen:turdus sp:merula".to_string(),
            max_pages: 1,
            filename: dir.path().join("xeno-canto").join("recordings.csv"),
            output_dir: dir.path().join("xeno-canto").join("audio_files"),
        };

        let summary = crawler.run(&request).await.unwrap();

        assert_eq!(summary.fetch.recordings.len(), 2);
        assert_eq!(summary.table, request.filename);
        assert_eq!(summary.downloads.total, 2);
        assert_eq!(summary.downloads.saved, 1);
        assert_eq!(summary.downloads.failures[0].file_name, "XC2.mp3");

        let saved = std::fs::read(request.output_dir.join("XC1.mp3")).unwrap();
        assert_eq!(saved, b"one");

        let csv = std::fs::read_to_string(&request.filename).unwrap();
        assert!(csv.contains("\"Parus major, Erithacus rubecula\""));
    }

    #[tokio::test]
    async fn partial_crawl_reports_through_tracing_once() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/api/2/recordings"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numPages": 2,
                "recordings": [{
                    "id": "7",
                    "file": format!("{}/7/download", server.uri()),
                    "file-name": "XC7.mp3"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/2/recordings"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/7/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"seven".to_vec()))
            .mount(&server)
            .await;

        let cfg = xc_config(&server);
        let http = HttpConfig::default();
        let crawler = Crawler::from_parts(
            RecordingFetcher::new(XenoCantoClient::new(&http, &cfg).unwrap(), cfg.page_delay),
            AudioDownloader::new(FileClient::new(&http, &cfg).unwrap())
        );
        let request = CrawlRequest {
            query: "gen:turdus".to_string(),
            max_pages: 2,
            filename: dir.path().join("recordings.csv"),
            output_dir: dir.path().join("audio_files"),
        };

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let summary = crawler.run(&request).await.unwrap();
        summary.log();

        assert_eq!(summary.fetch.pages_requested, 2);
        assert_eq!(summary.fetch.recordings.len(), 1);

        let out = logs.contents();
        assert_eq!(out.matches("fetch.abort").count(), 1, "{out}");
        assert!(out.contains("table.write"), "{out}");
        assert!(out.contains("download.saved"), "{out}");
        assert!(out.contains("crawler.summary"), "{out}");
        assert!(out.contains("partial=true"), "{out}");
    }
}
