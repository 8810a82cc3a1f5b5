// src/classifier.rs

use crate::filename::resolve_file_name;
use crate::models::{ClassifiedJob, MediaKind, Probe};
use crate::registry::{NameRegistry, RegistryError};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use thiserror::Error;

/// Extension given to the output of segmented (HLS) streams.
pub const SEGMENTED_EXTENSION: &str = "ts";

/// `application/*` subtypes that identify an HLS playlist.
const PLAYLIST_SUBTYPES: [&str; 3] = ["x-mpegurl", "vnd.apple.mpegurl", "mpegurl"];

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("status code error: {status} - {url}")]
    Status { status: StatusCode, url: Url },
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),
    #[error("{0}")]
    Name(#[from] RegistryError),
}

/// Media type of a response, reduced to what the downloader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: MediaKind,
    pub segmented: bool,
    /// Extension to give the output file, without the dot.
    pub extension: String,
}

impl MediaType {
    /// Parses a Content-Type header value such as `image/png; q=1`.
    pub fn parse(content_type: &str) -> Result<Self, ClassifyError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let unsupported = || ClassifyError::UnsupportedType(essence.clone());

        let (primary, subtype) = essence.split_once('/').ok_or_else(unsupported)?;
        if primary.is_empty() || subtype.is_empty() {
            return Err(unsupported());
        }
        // image/svg+xml is saved as .svg
        let extension = subtype.split('+').next().unwrap_or(subtype).to_string();

        match primary {
            "video" => Ok(Self { kind: MediaKind::Video, segmented: false, extension }),
            "image" => Ok(Self { kind: MediaKind::Image, segmented: false, extension }),
            "application" if PLAYLIST_SUBTYPES.contains(&subtype) => Ok(Self {
                kind: MediaKind::Video,
                segmented: true,
                extension: SEGMENTED_EXTENSION.to_string(),
            }),
            _ => Err(unsupported()),
        }
    }
}

/// Turns raw URLs into download jobs with reserved, unique file names.
#[derive(Debug, Clone)]
pub struct Classifier {
    client: Client,
    registry: Arc<NameRegistry>,
}

impl Classifier {
    pub fn new(client: Client, registry: Arc<NameRegistry>) -> Self {
        Self { client, registry }
    }

    /// Parses, probes and names `raw_url`, reserving the name for this run.
    pub async fn classify(&self, raw_url: &str) -> Result<ClassifiedJob, ClassifyError> {
        let url = Url::parse(raw_url).map_err(|source| ClassifyError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;

        let probe = self.probe(&url).await?;
        let file_name = self.registry.reserve(&probe.file_name).await?;
        let destination = self.registry.directory().join(&file_name);
        tracing::debug!(%url, kind = %probe.kind, segmented = probe.segmented, file_name = %file_name, "classified");

        Ok(ClassifiedJob::new(url, destination, Probe { file_name, ..probe }))
    }

    /// Fetches the response headers of `url` and derives media kind and a
    /// candidate file name from them.
    ///
    /// Uses `HEAD`, falling back to `GET` for servers that refuse it.
    pub async fn probe(&self, url: &Url) -> Result<Probe, ClassifyError> {
        let mut response = self.client.head(url.clone()).send().await?;
        if matches!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            tracing::debug!(%url, "HEAD refused, probing with GET");
            response = self.client.get(url.clone()).send().await?;
        }

        if !response.status().is_success() {
            return Err(ClassifyError::Status {
                status: response.status(),
                url: url.clone(),
            });
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let media = MediaType::parse(content_type)?;
        let disposition = headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok());

        Ok(Probe {
            file_name: resolve_file_name(url, disposition, &media.extension),
            kind: media.kind,
            segmented: media.segmented,
        })
    }
}
