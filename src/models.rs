// src/models.rs

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The kind of media a URL resolved to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Image => f.write_str("image"),
        }
    }
}

/// What a metadata probe learned about a URL, before any name is reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Candidate file name, not yet checked for uniqueness.
    pub file_name: String,
    pub kind: MediaKind,
    /// True when the resource is a segmented playlist (HLS).
    pub segmented: bool,
}

/// A download job produced by classification.
///
/// The file name has already been reserved in the run's name registry, so
/// no other job of the same run holds it.
#[derive(Debug, Clone)]
pub struct ClassifiedJob {
    pub url: Url,
    pub destination: PathBuf,
    pub kind: MediaKind,
    pub segmented: bool,
    pub file_name: String,
}

impl ClassifiedJob {
    pub fn new(url: Url, destination: PathBuf, probe: Probe) -> Self {
        Self {
            url,
            destination,
            kind: probe.kind,
            segmented: probe.segmented,
            file_name: probe.file_name,
        }
    }
}

/// How a single job ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The destination was already on disk; nothing was fetched.
    Existing,
    /// The file was written; `bytes` is its size on disk.
    Downloaded { bytes: u64 },
}
