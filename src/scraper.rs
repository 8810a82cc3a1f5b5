// src/scraper.rs

use crate::classifier::Classifier;
use crate::config::{ConfigError, ExistingFiles, ScraperConfig};
use crate::downloader::DownloadExecutor;
use crate::hls::HlsClient;
use crate::models::ClassifiedJob;
use crate::pool::run_phase;
use crate::progress::{Progress, ProgressSink, TickOnDrop};
use crate::queue::WorkQueue;
use crate::registry::NameRegistry;
use crate::segmented::SegmentedClient;
use crate::stats::{ErrorLog, JobError, Report, Statistics};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures that stop a run before any work starts.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Downloads a batch of media URLs into one directory.
///
/// A run has two phases: every URL is classified and given a unique name,
/// then the resulting jobs are downloaded. Each phase uses `workers`
/// concurrent workers.
pub struct Scraper {
    raw_urls: Vec<String>,
    output: PathBuf,
    config: ScraperConfig,
    client: Client,
    segmented: Arc<dyn SegmentedClient>,
}

impl Scraper {
    /// Validates `config` and creates `output` if it does not exist yet.
    pub async fn new(
        raw_urls: Vec<String>,
        output: impl Into<PathBuf>,
        config: ScraperConfig,
    ) -> Result<Self, ScrapeError> {
        config.validate()?;

        let mut output = output.into();
        if output.as_os_str().is_empty() {
            output = PathBuf::from(".");
        }
        tokio::fs::create_dir_all(&output)
            .await
            .map_err(|source| ScrapeError::OutputDir {
                path: output.clone(),
                source,
            })?;

        let client = Client::builder().user_agent(config.user_agent.as_str()).build()?;
        let segmented: Arc<dyn SegmentedClient> = Arc::new(HlsClient::new(client.clone()));

        Ok(Self {
            raw_urls,
            output,
            config,
            client,
            segmented,
        })
    }

    /// Replaces the default HLS client used for segmented streams.
    pub fn with_segmented_client(mut self, segmented: Arc<dyn SegmentedClient>) -> Self {
        self.segmented = segmented;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Runs both phases to completion and returns the final statistics.
    ///
    /// Per-job failures end up in the report; they never abort the run.
    pub async fn scrape(self) -> Report {
        let workers = self.config.workers;
        let total_urls = self.raw_urls.len();
        let ctx = Arc::new(RunContext::new(&self, total_urls));

        tracing::info!(urls = total_urls, workers, output = %self.output.display(), "classifying");
        let raw_urls: WorkQueue<String> = self.raw_urls.into_iter().collect();
        classify_all(&ctx, Arc::new(raw_urls), total_urls, workers).await;

        let total_jobs = ctx.jobs.len().await;
        if total_jobs == 0 {
            tracing::info!("nothing to download");
            return Report::collect(&ctx.stats, &ctx.errors, Duration::ZERO).await;
        }

        tracing::info!(jobs = total_jobs, "downloading");
        let started = Instant::now();
        download_all(&ctx, total_jobs, workers).await;
        let elapsed = started.elapsed();

        Report::collect(&ctx.stats, &ctx.errors, elapsed).await
    }
}

/// Everything the workers of one run share.
struct RunContext {
    classifier: Classifier,
    executor: DownloadExecutor,
    jobs: Arc<WorkQueue<ClassifiedJob>>,
    stats: Statistics,
    errors: Arc<ErrorLog>,
    progress: Progress,
}

impl RunContext {
    fn new(scraper: &Scraper, total_urls: usize) -> Self {
        let registry = match scraper.config.existing_files {
            ExistingFiles::Rename => NameRegistry::new(&scraper.output),
            ExistingFiles::Skip => NameRegistry::in_memory(&scraper.output),
        };

        Self {
            classifier: Classifier::new(scraper.client.clone(), Arc::new(registry)),
            executor: DownloadExecutor::new(
                scraper.client.clone(),
                scraper.segmented.clone(),
                scraper.config.segment_workers,
            ),
            jobs: Arc::new(WorkQueue::new()),
            stats: Statistics::new(total_urls),
            errors: Arc::new(ErrorLog::new()),
            progress: Progress::new(scraper.config.progress),
        }
    }

    async fn classify(&self, raw_url: &str) -> Result<(), JobError> {
        if raw_url.is_empty() {
            self.stats.exclude_url();
            return Ok(());
        }
        let job = self.classifier.classify(raw_url).await?;
        self.jobs.push(job).await;
        Ok(())
    }

    async fn download(&self, job: ClassifiedJob) -> Result<(), JobError> {
        let bar: Arc<dyn ProgressSink> = Arc::new(self.progress.job_bar(&job.file_name, job.segmented));
        let outcome = self.executor.execute(&job, bar).await?;
        self.stats.record(outcome);
        Ok(())
    }
}

async fn classify_all(ctx: &Arc<RunContext>, raw_urls: Arc<WorkQueue<String>>, total: usize, workers: usize) {
    let bar = ctx.progress.parsing_bar(total as u64);

    let worker_ctx = ctx.clone();
    let worker_bar = bar.clone();
    run_phase(raw_urls, workers, ctx.errors.clone(), move |raw_url| {
        let ctx = worker_ctx.clone();
        let tick = TickOnDrop(worker_bar.clone());
        async move {
            let _tick = tick;
            ctx.classify(&raw_url).await
        }
    })
    .await;

    bar.finish_and_clear();
}

async fn download_all(ctx: &Arc<RunContext>, total: usize, workers: usize) {
    let overall = ctx.progress.overall_bar(total as u64);

    let worker_ctx = ctx.clone();
    let worker_bar = overall.clone();
    run_phase(ctx.jobs.clone(), workers, ctx.errors.clone(), move |job| {
        let ctx = worker_ctx.clone();
        let tick = TickOnDrop(worker_bar.clone());
        async move {
            let _tick = tick;
            ctx.download(job).await
        }
    })
    .await;

    overall.finish_with_message("Done!");
}
