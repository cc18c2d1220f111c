//!
//! src/main.rs  xc-crawler  Oct 19th, 2026
//!
//! Entry point of the crawler: parses arguments, loads configuration,
//! starts the logger and runs fetch -> table -> download
//!
//!

mod config;
mod errors;
mod logging;

mod types;
mod fetch;
mod table;
mod download;
mod crawler;

use std::path::PathBuf;

use clap::Parser;

use crate::errors::CrawlerError;

#[derive(Parser, Debug)]
#[command(name = "xc-crawler")]
#[command(about = "Fetch and save audio recordings from Xeno-canto.")]
#[command(version)]
struct Cli {
    /// Maximum number of pages to retrieve.
    #[arg(long = "max_pages", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// Filename for the CSV file to save recordings.
    #[arg(long, default_value = "xeno-canto/recordings.csv")]
    filename: PathBuf,

    /// Directory to save downloaded audio files.
    #[arg(long = "output_dir", default_value = "xeno-canto/audio_files")]
    output_dir: PathBuf,

    /// Query with specific filters, e.g. "gen:turdus cnt:netherlands".
    #[arg(long)]
    query: String,
}

impl Cli {
    fn into_request(self) -> crawler::CrawlRequest {
        crawler::CrawlRequest {
            query: self.query,
            max_pages: self.max_pages,
            filename: self.filename,
            output_dir: self.output_dir,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CrawlerError> {
    let cli     = Cli::parse();
    let cfgs    = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service = "xc-crawler",
        version = %env!("CARGO_PKG_VERSION"),
        base_url = %cfgs.xeno_canto.base_url,
        "starting"
    );

    let crawler = crawler::Crawler::new(&cfgs)?;
    let summary = crawler.run(&cli.into_request()).await?;
    summary.log();

    Ok(())
}
