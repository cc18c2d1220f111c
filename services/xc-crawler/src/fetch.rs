//!
//! src/fetch.rs  xc-crawler  Oct 19th, 2026
//!
//! Defines methods for hitting the xeno-canto endpoints and
//! returning parsed pages or raw audio bytes
//!

use std::time::Duration;

use url::Url;
use reqwest::{Client, header, redirect, RequestBuilder, Response};
use crate::config::{HttpConfig, XenoCantoConfig};
use crate::types::SearchPage;
use crate::CrawlerError;

/// Client building functionality
fn client_helper(http: &HttpConfig, timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers_and_agent(
    http: &HttpConfig,
    timeout: Duration,
    headers: header::HeaderMap,
    user_agent: &str
) -> Result<Client, CrawlerError> {
    client_helper(http, timeout)
        .default_headers(headers)
        .user_agent(user_agent)
        .build()
        .map_err(|e| CrawlerError::Http(format!("build client: {e}")))
}

/// Turns any non-2xx answer into a status error naming the url
fn ensure_success(response: Response) -> Result<Response, CrawlerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CrawlerError::Status {
            status: status.as_u16(),
            url: response.url().to_string()
        })
    }
}

#[derive(Clone, Debug)]
pub struct XenoCantoClient {
    pub http: Client,
    pub base: Url
}

impl XenoCantoClient {
    pub fn new(http_config: &HttpConfig, cfg: &XenoCantoConfig) ->
        Result<Self, CrawlerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let http = client_with_headers_and_agent(
            http_config,
            http_config.timeout,
            headers,
            &cfg.user_agent
        )?;
        Ok( Self { http, base: cfg.base_url.clone() })
    }

    /// GET {base}?query=...&page=...
    pub fn search(&self, query: &str, page: u32) -> RequestBuilder {
        let page = page.to_string();
        self.http.get(self.base.clone()).query(&[
            ("query", query),
            ("page", page.as_str())
        ])
    }

    /// Sends one search request, failing on transport, status or body errors
    pub async fn search_page(&self, query: &str, page: u32) ->
        Result<SearchPage, CrawlerError> {
        let response = ensure_success(self.search(query, page).send().await?)?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<SearchPage>(&body)?)
    }
}

/// Plain client for audio payloads, redirects are followed to the file host
#[derive(Clone, Debug)]
pub struct FileClient {
    pub http: Client
}

impl FileClient {
    pub fn new(http_config: &HttpConfig, cfg: &XenoCantoConfig) ->
        Result<Self, CrawlerError> {
        let http = client_with_headers_and_agent(
            http_config,
            http_config.download_timeout,
            header::HeaderMap::new(),
            &cfg.user_agent
        )?;
        Ok( Self { http })
    }

    /// GET {file_url}
    pub fn file(&self, file_url: &str) -> RequestBuilder {
        self.http.get(file_url)
    }

    pub async fn fetch_bytes(&self, file_url: &str) -> Result<Vec<u8>, CrawlerError> {
        let response = ensure_success(self.file(file_url).send().await?)?;
        Ok(response.bytes().await?.to_vec())
    }
}
