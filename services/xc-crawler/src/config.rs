//!
//! src/config.rs  xc-crawler  Oct 19th, 2026
//!
//! Loads environment backed configuration for the xeno-canto api,
//! http clients and logger
//!

use url::Url;
use std::time;
use crate::CrawlerError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 30_000;
pub const HTTP_DOWNLOAD_TIMEOUT: u64 = 300_000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 5_000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90_000;
pub const HTTP_MAX_REDIRECTS: u8 = 8;

pub const XC_BASE_URL: &str = "https://xeno-canto.org/api/2/recordings";
pub const XC_PAGE_DELAY: u64 = 1_000;

/// Returns the variable only if it is set and non-blank
fn env_opt(s: &str) -> Option<String> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    match raw {
        Some(s) => s.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}

/// Ensures that url is http(s) and names a host
fn ensure_http(url: &Url) -> Result<(), String> {
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(format!("URL must be http(s): {url}"));
    }
    match url.host_str() {
        Some(_) => Ok(()),
        None => Err(format!("URL missing host: {url}")),
    }
}

///
/// Configuration for the recordings search api
///
#[derive(Debug, Clone)]
pub struct XenoCantoConfig {
    pub base_url: Url,              // https://xeno-canto.org/api/2/recordings
    pub user_agent: String,         // xc-crawler/0.1.0
    pub page_delay: time::Duration, // pause between page requests
}

fn default_user_agent() -> String {
    format!("xc-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn build_xeno_canto(
    base_url: Option<String>,
    user_agent: Option<String>,
    page_delay: Option<String>
) -> Result<XenoCantoConfig, CrawlerError> {
    let base_url = base_url.unwrap_or_else(|| XC_BASE_URL.to_string());
    let base_url = Url::parse(base_url.trim())
        .map_err(|e| CrawlerError::Config(format!("XC_BASE_URL invalid {e}")))?;
    ensure_http(&base_url).map_err(CrawlerError::Config)?;

    let user_agent = user_agent.unwrap_or_else(default_user_agent);
    let page_delay = time::Duration::from_millis(parse_or(page_delay, XC_PAGE_DELAY));

    Ok( XenoCantoConfig { base_url, user_agent, page_delay } )
}

///
/// Configuration for Http timeouts, pooling, redirects
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub download_timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            download_timeout: time::Duration::from_millis(HTTP_DOWNLOAD_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,xc_crawler=info,reqwest=warn,hyper=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: false,
        }
    }
}

fn build_logging(format: Option<String>) -> LoggingConfig {
    let format = format
        .as_deref()
        .and_then(LogFormat::parse)
        .unwrap_or(LogFormat::Pretty);

    // json output is meant for collectors, keep file/line for them
    match format {
        LogFormat::Json => LoggingConfig {
            format,
            with_ansi: false,
            include_file_line: true,
            include_target: true,
            ..LoggingConfig::default()
        },
        LogFormat::Pretty => LoggingConfig::default(),
    }
}

///
/// AppConfig which holds everything the crawler stages need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub xeno_canto: XenoCantoConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, CrawlerError> {
    dotenvy::dotenv().ok();

    let xeno_canto = build_xeno_canto(
        env_opt("XC_BASE_URL"),
        env_opt("XC_USER_AGENT"),
        env_opt("XC_PAGE_DELAY_MS")
    )?;
    let http    = HttpConfig::default();
    let logging = build_logging(env_opt("LOG_FORMAT"));

    Ok( AppConfig { xeno_canto, http, logging } )
}
