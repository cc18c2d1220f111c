//!
//! src/errors.rs  xc-crawler  Oct 19th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the crawler uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("table is missing required column `{0}`")]
    MissingColumn(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for CrawlerError {
    fn from(e: reqwest::Error) -> Self { CrawlerError::Http(e.to_string()) }
}

impl From<serde_json::Error> for CrawlerError {
    fn from(e: serde_json::Error) -> Self { CrawlerError::Parse(e.to_string()) }
}

impl From<csv::Error> for CrawlerError {
    fn from(e: csv::Error) -> Self { CrawlerError::Csv(e.to_string()) }
}

impl From<tempfile::PersistError> for CrawlerError {
    fn from(e: tempfile::PersistError) -> Self { CrawlerError::Io(e.error) }
}
