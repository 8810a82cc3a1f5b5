// src/stats.rs

use crate::classifier::ClassifyError;
use crate::downloader::DownloadError;
use crate::models::JobOutcome;
use bytesize::ByteSize;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// A per-job failure. None of these stop the run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Run-wide counters, updated by every worker.
#[derive(Debug, Default)]
pub struct Statistics {
    total_urls: AtomicUsize,
    existing: AtomicU64,
    downloaded: AtomicU64,
    total_bytes: AtomicU64,
}

impl Statistics {
    pub fn new(total_urls: usize) -> Self {
        Self {
            total_urls: AtomicUsize::new(total_urls),
            ..Self::default()
        }
    }

    /// Drops an empty input entry from the URL total.
    pub fn exclude_url(&self) {
        self.total_urls.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn record(&self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Existing => {
                self.existing.fetch_add(1, Ordering::SeqCst);
            }
            JobOutcome::Downloaded { bytes } => {
                self.downloaded.fetch_add(1, Ordering::SeqCst);
                if bytes > 0 {
                    self.total_bytes.fetch_add(bytes, Ordering::SeqCst);
                }
            }
        }
    }

    pub fn total_urls(&self) -> usize {
        self.total_urls.load(Ordering::SeqCst)
    }

    pub fn existing(&self) -> u64 {
        self.existing.load(Ordering::SeqCst)
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::SeqCst)
    }
}

/// Append-only list of job failures, in the order they were recorded.
#[derive(Debug, Default)]
pub struct ErrorLog {
    count: AtomicU64,
    entries: Mutex<Vec<JobError>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, error: impl Into<JobError>) {
        let error = error.into();
        tracing::warn!(%error, "job failed");
        self.entries.lock().await.push(error);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Error messages in recording order.
    pub async fn messages(&self) -> Vec<String> {
        self.entries.lock().await.iter().map(ToString::to_string).collect()
    }
}

/// Summary printed once every worker has finished.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_urls: usize,
    pub existing: u64,
    pub downloaded: u64,
    pub total_bytes: u64,
    /// Wall-clock time of the download phase.
    pub elapsed: Duration,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl Report {
    pub async fn collect(stats: &Statistics, errors: &ErrorLog, elapsed: Duration) -> Self {
        Self {
            total_urls: stats.total_urls(),
            existing: stats.existing(),
            downloaded: stats.downloaded(),
            total_bytes: stats.total_bytes(),
            elapsed,
            failed: errors.count(),
            errors: errors.messages().await,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(f, "Total URLs: {}", self.total_urls)?;
        if self.existing > 0 {
            writeln!(f, "\t{} existing", self.existing)?;
        }
        if self.downloaded > 0 {
            writeln!(f, "\t{} downloaded", self.downloaded)?;
            writeln!(f, "\t\t{} size", ByteSize::b(self.total_bytes))?;
            writeln!(f, "\t\t{} time", humanize_duration(self.elapsed))?;
        }
        if self.failed > 0 {
            writeln!(f, "Total failed: {}", self.failed)?;
            if !self.errors.is_empty() {
                writeln!(f, "Errors:")?;
                for error in &self.errors {
                    writeln!(f, "{error}")?;
                }
            }
        }
        Ok(())
    }
}

/// `HH:MM:SS`.
pub fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}
