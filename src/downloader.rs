use crate::models::{ClassifiedJob, JobOutcome};
use crate::progress::{CompleteOnDrop, ProgressSink};
use crate::segmented::{SegmentedClient, SegmentedError};
use futures_util::TryStreamExt;
use reqwest::{Client, StatusCode, Url};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Custom errors for download operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("status code error: {status} - {url}")]
    Status { status: StatusCode, url: Url },
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("segmented transfer of {url} failed: {source}")]
    Segmented {
        url: Url,
        #[source]
        source: SegmentedError,
    },
}

impl DownloadError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Executes classified jobs: a direct streamed copy, or a hand-off to the
/// segmented-stream client.
pub struct DownloadExecutor {
    client: Client,
    segmented: Arc<dyn SegmentedClient>,
    /// Concurrency for segment fetching, independent of the outer pool.
    segment_workers: usize,
}

impl DownloadExecutor {
    pub fn new(client: Client, segmented: Arc<dyn SegmentedClient>, segment_workers: usize) -> Self {
        Self { client, segmented, segment_workers }
    }

    /// Downloads `job` unless its destination already exists.
    ///
    /// `sink.complete()` is called exactly once, whatever the outcome, even
    /// if the transfer panics. A failed transfer leaves no partial file behind.
    pub async fn execute(
        &self,
        job: &ClassifiedJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobOutcome, DownloadError> {
        let _done = CompleteOnDrop(sink.clone());
        match tokio::fs::try_exists(&job.destination).await {
            Ok(true) => {
                tracing::debug!(path = %job.destination.display(), "already on disk");
                Ok(JobOutcome::Existing)
            }
            Ok(false) => self.transfer(job, sink).await,
            Err(e) => Err(DownloadError::io(&job.destination, e)),
        }
    }

    async fn transfer(
        &self,
        job: &ClassifiedJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobOutcome, DownloadError> {
        let result = if job.segmented {
            self.download_segmented(job, sink).await
        } else {
            self.download_direct(job, sink.as_ref()).await
        };

        if let Err(e) = result {
            remove_partial(&job.destination).await;
            return Err(e);
        }

        let bytes = match tokio::fs::metadata(&job.destination).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %job.destination.display(), error = %e, "could not stat download");
                0
            }
        };
        tracing::debug!(url = %job.url, bytes, "downloaded");
        Ok(JobOutcome::Downloaded { bytes })
    }

    async fn download_direct(
        &self,
        job: &ClassifiedJob,
        sink: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        let response = self.client.get(job.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status(),
                url: job.url.clone(),
            });
        }

        let path = &job.destination;
        let mut file = File::create(path).await.map_err(|e| DownloadError::io(path, e))?;
        let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        tokio::pin!(body);
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        file.flush().await.map_err(|e| DownloadError::io(path, e))?;

        sink.increment();
        Ok(())
    }

    async fn download_segmented(
        &self,
        job: &ClassifiedJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<(), DownloadError> {
        let failed = |source| DownloadError::Segmented {
            url: job.url.clone(),
            source,
        };

        let mut transfer = self.segmented.open(&job.url, &job.destination).map_err(failed)?;
        transfer.set_workers(self.segment_workers).map_err(failed)?;
        transfer.set_progress_sink(sink).map_err(failed)?;
        transfer.download().await.map_err(failed)?;
        Ok(())
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}
