// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use mediascrape::config::{ExistingFiles, ScraperConfig};
use mediascrape::logging::init_logging;
use mediascrape::scraper::Scraper;
use std::path::PathBuf;

/// Downloads images, videos and HLS streams concurrently.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URLs to download.
    urls: Vec<String>,

    /// File with one URL per line, read before the positional URLs.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the media is saved to (created if missing).
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Concurrent workers per phase.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Concurrent segment fetches per HLS stream.
    #[arg(long)]
    segment_workers: Option<usize>,

    /// TOML config file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep names of files already on disk and skip them instead of renaming.
    #[arg(long)]
    skip_existing: bool,

    /// Do not draw progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,

    /// Log phase and job details to stderr.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Result<ScraperConfig> {
        let mut config = match &self.config {
            Some(path) => ScraperConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ScraperConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(segment_workers) = self.segment_workers {
            config.segment_workers = segment_workers;
        }
        if self.skip_existing {
            config.existing_files = ExistingFiles::Skip;
        }
        if self.no_progress || self.json {
            config.progress = false;
        }
        Ok(config)
    }

    async fn urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        if let Some(path) = &self.input {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            urls.extend(contents.lines().map(|line| line.trim().to_string()));
        }
        urls.extend(self.urls.iter().cloned());
        Ok(urls)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = args.config()?;
    let urls = args.urls().await?;
    let json = args.json;

    let scraper = Scraper::new(urls, args.output, config).await?;
    let report = scraper.scrape().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    Ok(())
}
