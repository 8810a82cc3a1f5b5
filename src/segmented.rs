// src/segmented.rs

use crate::progress::ProgressSink;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("status code error: {status} - {url}")]
    Status { status: StatusCode, url: Url },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid segment worker count: {0}")]
    InvalidWorkers(usize),
    #[error("playlist has no segments: {0}")]
    EmptyPlaylist(Url),
    #[error("encrypted playlists are not supported: {0}")]
    Encrypted(Url),
    #[error("playlist uses unsupported {tag}: {url}")]
    UnsupportedPlaylist { tag: &'static str, url: Url },
    #[error("invalid segment uri {uri}: {source}")]
    SegmentUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
}

/// Opens transfers of segmented streams.
///
/// The pipeline only talks to these two traits, so any segmented-stream
/// client can be plugged in.
pub trait SegmentedClient: Send + Sync {
    fn open(
        &self,
        source: &Url,
        destination: &Path,
    ) -> Result<Box<dyn SegmentedTransfer>, SegmentedError>;
}

/// One configured segmented transfer.
#[async_trait]
pub trait SegmentedTransfer: Send {
    /// Number of segments fetched concurrently.
    fn set_workers(&mut self, workers: usize) -> Result<(), SegmentedError>;

    /// Receives `set_total` and `increment` events. Implementations must not
    /// call `complete`; the caller does that once per job.
    fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) -> Result<(), SegmentedError>;

    /// Runs the transfer and returns the number of bytes written.
    async fn download(&mut self) -> Result<u64, SegmentedError>;
}
