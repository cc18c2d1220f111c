//!
//! src/download.rs  xc-crawler  Oct 19th, 2026
//!
//! Pulls every audio file listed in a recording table into an output
//! directory. A failed row is logged and collected, never fatal.
//!

use std::{fs, io::Write, path::{Component, Path}};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::errors::CrawlerError;
use crate::fetch::FileClient;
use crate::table::{read_download_jobs, DownloadJob};

#[derive(Debug)]
pub struct DownloadFailure {
    pub file_name: String,
    pub error: CrawlerError,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub total: usize,
    pub saved: usize,
    pub failures: Vec<DownloadFailure>,
}

/// File names come from the remote api, only bare names are accepted
fn check_file_name(name: &str) -> Result<(), CrawlerError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(CrawlerError::Parse(format!("unusable file name `{name}`"))),
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar.set_message("Downloading audio recordings");
    bar
}

pub struct AudioDownloader {
    client: FileClient,
}

impl AudioDownloader {
    pub fn new(client: FileClient) -> Self {
        Self { client }
    }

    ///
    /// Reads the table at `table` and saves each row's file under
    /// `output_dir`, overwriting files of the same name.
    ///
    pub async fn download_all(
        &self,
        table: impl AsRef<Path>,
        output_dir: impl AsRef<Path>
    ) -> Result<DownloadReport, CrawlerError> {
        let jobs = read_download_jobs(table)?;
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut report = DownloadReport { total: jobs.len(), ..DownloadReport::default() };
        let bar = progress_bar(jobs.len());

        for job in jobs {
            match self.download_one(&job, output_dir).await {
                Ok(bytes) => {
                    report.saved += 1;
                    info!(file = %job.file_name, bytes, "download.saved");
                }
                Err(error) => {
                    warn!(file = %job.file_name, error = %error, "download.fail");
                    report.failures.push(DownloadFailure { file_name: job.file_name, error });
                }
            }
            bar.inc(1);
        }
        bar.finish();

        info!(
            total = report.total,
            saved = report.saved,
            failed = report.failures.len(),
            dir = %output_dir.display(),
            "download.done"
        );
        Ok(report)
    }

    async fn download_one(&self, job: &DownloadJob, output_dir: &Path) ->
        Result<usize, CrawlerError> {
        if job.file_url.trim().is_empty() {
            return Err(CrawlerError::Parse("row has no file url".to_string()));
        }
        check_file_name(&job.file_name)?;

        let body = self.client.fetch_bytes(&job.file_url).await?;

        let mut temp = tempfile::NamedTempFile::new_in(output_dir)?;
        temp.write_all(&body)?;
        temp.persist(output_dir.join(&job.file_name))?;
        Ok(body.len())
    }
}
