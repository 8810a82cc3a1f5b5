pub mod classifier;
pub mod config;
pub mod downloader;
pub mod filename;
pub mod hls;
pub mod logging;
pub mod models;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod scraper;
pub mod segmented;
pub mod stats;

/// Convenient type alias exposing common structs.
pub mod prelude {
    pub use crate::classifier::{Classifier, ClassifyError};
    pub use crate::config::{ExistingFiles, ScraperConfig};
    pub use crate::downloader::{DownloadError, DownloadExecutor};
    pub use crate::models::{ClassifiedJob, JobOutcome, MediaKind};
    pub use crate::progress::{NoProgress, ProgressSink};
    pub use crate::registry::{NameRegistry, RegistryError};
    pub use crate::scraper::{ScrapeError, Scraper};
    pub use crate::segmented::{SegmentedClient, SegmentedError, SegmentedTransfer};
    pub use crate::stats::{JobError, Report};
}
