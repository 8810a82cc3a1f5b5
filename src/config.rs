// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("segment worker count must be at least 1")]
    ZeroSegmentWorkers,
}

/// What the name registry does when a candidate name is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingFiles {
    /// Pick a disambiguated name such as `photo (1).jpg`.
    #[default]
    Rename,
    /// Keep the name; the download phase reports the job as existing.
    Skip,
}

/// Settings for one scrape run (optionally loaded from a TOML file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Concurrent workers per phase (classification, then download).
    pub workers: usize,
    /// Concurrency handed to the segmented-stream transfer.
    pub segment_workers: usize,
    pub user_agent: String,
    pub existing_files: ExistingFiles,
    /// Draw progress bars on stderr.
    pub progress: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            segment_workers: 20,
            user_agent: concat!("mediascrape/", env!("CARGO_PKG_VERSION")).to_string(),
            existing_files: ExistingFiles::Rename,
            progress: true,
        }
    }
}

impl ScraperConfig {
    /// Reads a TOML config file. Missing keys take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: ScraperConfig = toml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.segment_workers == 0 {
            return Err(ConfigError::ZeroSegmentWorkers);
        }
        Ok(())
    }
}
