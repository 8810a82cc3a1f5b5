//! Default segmented-stream client for HLS playlists.
//!
//! Master playlists resolve to their highest-bandwidth variant. Segments are
//! fetched with a bounded number in flight and appended to the destination
//! in playlist order.

use crate::progress::{NoProgress, ProgressSink};
use crate::segmented::{SegmentedClient, SegmentedError, SegmentedTransfer};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Tags whose segments cannot be rebuilt by concatenating whole responses:
/// fMP4 init sections and byte-range sub-segments.
const UNSUPPORTED_TAGS: [&str; 2] = ["#EXT-X-MAP", "#EXT-X-BYTERANGE"];

#[derive(Debug, Clone)]
pub struct HlsClient {
    client: Client,
}

impl HlsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SegmentedClient for HlsClient {
    fn open(
        &self,
        source: &Url,
        destination: &Path,
    ) -> Result<Box<dyn SegmentedTransfer>, SegmentedError> {
        Ok(Box::new(HlsTransfer {
            client: self.client.clone(),
            source: source.clone(),
            destination: destination.to_path_buf(),
            workers: 1,
            sink: Arc::new(NoProgress),
        }))
    }
}

pub struct HlsTransfer {
    client: Client,
    source: Url,
    destination: PathBuf,
    workers: usize,
    sink: Arc<dyn ProgressSink>,
}

#[async_trait]
impl SegmentedTransfer for HlsTransfer {
    fn set_workers(&mut self, workers: usize) -> Result<(), SegmentedError> {
        if workers == 0 {
            return Err(SegmentedError::InvalidWorkers(workers));
        }
        self.workers = workers;
        Ok(())
    }

    fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) -> Result<(), SegmentedError> {
        self.sink = sink;
        Ok(())
    }

    async fn download(&mut self) -> Result<u64, SegmentedError> {
        let (playlist_url, playlist) = self.media_playlist().await?;
        let segments = segment_urls(&playlist, &playlist_url)?;
        if segments.is_empty() {
            return Err(SegmentedError::EmptyPlaylist(playlist_url));
        }
        tracing::debug!(url = %playlist_url, segments = segments.len(), "fetching segments");
        self.sink.set_total(segments.len() as u64);

        let mut out = BufWriter::new(File::create(&self.destination).await?);
        let client = self.client.clone();
        let mut fetches = stream::iter(segments)
            .map(move |url| fetch(client.clone(), url))
            .buffered(self.workers);

        let mut written = 0u64;
        while let Some(bytes) = fetches.next().await {
            let bytes = bytes?;
            out.write_all(&bytes).await?;
            written += bytes.len() as u64;
            self.sink.increment();
        }
        out.flush().await?;

        Ok(written)
    }
}

impl HlsTransfer {
    /// Fetches the source playlist, following a master playlist to its best variant.
    async fn media_playlist(&self) -> Result<(Url, String), SegmentedError> {
        let body = fetch_text(&self.client, &self.source).await?;
        match best_variant(&body) {
            Some(uri) => {
                let variant = join(&self.source, uri)?;
                tracing::debug!(%variant, "following master playlist");
                let body = fetch_text(&self.client, &variant).await?;
                Ok((variant, body))
            }
            None => Ok((self.source.clone(), body)),
        }
    }
}

async fn fetch(client: Client, url: Url) -> Result<Bytes, SegmentedError> {
    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(SegmentedError::Status {
            status: response.status(),
            url,
        });
    }
    Ok(response.bytes().await?)
}

async fn fetch_text(client: &Client, url: &Url) -> Result<String, SegmentedError> {
    let bytes = fetch(client.clone(), url.clone()).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// URI of the highest-`BANDWIDTH` variant, or `None` for a media playlist.
fn best_variant(playlist: &str) -> Option<&str> {
    let mut best: Option<(u64, &str)> = None;
    let mut pending: Option<u64> = None;

    for line in playlist.lines().map(str::trim) {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending = Some(attribute(attrs, "BANDWIDTH").and_then(|b| b.parse().ok()).unwrap_or(0));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(bandwidth) = pending.take() {
                if best.map_or(true, |(b, _)| bandwidth > b) {
                    best = Some((bandwidth, line));
                }
            }
        }
    }

    best.map(|(_, uri)| uri)
}

/// Segment URLs of a media playlist, resolved against `base`.
fn segment_urls(playlist: &str, base: &Url) -> Result<Vec<Url>, SegmentedError> {
    let mut urls = Vec::new();
    for line in playlist.lines().map(str::trim) {
        if let Some(tag) = UNSUPPORTED_TAGS.into_iter().find(|tag| line.starts_with(tag)) {
            return Err(SegmentedError::UnsupportedPlaylist {
                tag,
                url: base.clone(),
            });
        }
        if let Some(attrs) = line.strip_prefix("#EXT-X-KEY:") {
            if attribute(attrs, "METHOD").is_some_and(|m| m != "NONE") {
                return Err(SegmentedError::Encrypted(base.clone()));
            }
        } else if !line.is_empty() && !line.starts_with('#') {
            urls.push(join(base, line)?);
        }
    }
    Ok(urls)
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    attrs.split(',').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.trim_matches('"'))
    })
}

fn join(base: &Url, uri: &str) -> Result<Url, SegmentedError> {
    base.join(uri).map_err(|source| SegmentedError::SegmentUri {
        uri: uri.to_string(),
        source,
    })
}
