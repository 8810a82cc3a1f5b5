// src/registry.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// How many names (the candidate itself, then `name (1)` .. `name (999)`)
/// are tried before giving up.
pub const MAX_DUPLICATE_ATTEMPTS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid file name")]
    InvalidName,
    #[error("could not find unique file name for {0}, too many duplicates")]
    ExhaustedAttempts(String),
}

/// Hands out output file names that are unique within one run.
///
/// The claimed set and the on-disk probe share one lock, so two workers can
/// never both decide that the same disk-free name is theirs.
#[derive(Debug)]
pub struct NameRegistry {
    directory: PathBuf,
    check_disk: bool,
    claimed: Mutex<HashSet<String>>,
}

impl NameRegistry {
    /// Registry whose names must also be free in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            check_disk: true,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Registry that only avoids names claimed earlier in this run; files
    /// already on disk keep their name.
    pub fn in_memory(directory: impl Into<PathBuf>) -> Self {
        Self {
            check_disk: false,
            ..Self::new(directory)
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Claims `candidate`, or the first free disambiguated variant of it.
    pub async fn reserve(&self, candidate: &str) -> Result<String, RegistryError> {
        if candidate.is_empty() {
            return Err(RegistryError::InvalidName);
        }

        let mut claimed = self.claimed.lock().await;
        for attempt in 0..MAX_DUPLICATE_ATTEMPTS {
            let name = disambiguate(candidate, attempt);
            if claimed.contains(&name) {
                continue;
            }
            if self.check_disk && tokio::fs::metadata(self.directory.join(&name)).await.is_ok() {
                continue;
            }
            tracing::debug!(candidate, name = %name, "reserved file name");
            claimed.insert(name.clone());
            return Ok(name);
        }

        Err(RegistryError::ExhaustedAttempts(candidate.to_string()))
    }

    /// Number of names claimed so far.
    pub async fn len(&self) -> usize {
        self.claimed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.claimed.lock().await.is_empty()
    }
}

/// `photo.jpg` with attempt 2 becomes `photo (2).jpg`; attempt 0 is the name itself.
fn disambiguate(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    };
    format!("{stem} ({attempt}){ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(disambiguate("photo.jpg", 0), "photo.jpg");
        assert_eq!(disambiguate("photo.jpg", 1), "photo (1).jpg");
        assert_eq!(disambiguate("archive.tar.gz", 3), "archive.tar (3).gz");
        assert_eq!(disambiguate("README", 2), "README (2)");
    }

    #[tokio::test]
    async fn empty_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let registry = NameRegistry::new(dir.path());
        assert_eq!(registry.reserve("").await, Err(RegistryError::InvalidName));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn repeated_names_are_disambiguated() {
        let dir = tempfile::tempdir().unwrap();
        let registry = NameRegistry::new(dir.path());
        assert_eq!(registry.reserve("photo.jpg").await.unwrap(), "photo.jpg");
        assert_eq!(registry.reserve("photo.jpg").await.unwrap(), "photo (1).jpg");
        assert_eq!(registry.reserve("photo.jpg").await.unwrap(), "photo (2).jpg");
    }

    #[tokio::test]
    async fn existing_files_are_avoided() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();
        std::fs::write(dir.path().join("clip (1).mp4"), b"old").unwrap();

        let registry = NameRegistry::new(dir.path());
        assert_eq!(registry.reserve("clip.mp4").await.unwrap(), "clip (2).mp4");
    }

    #[tokio::test]
    async fn in_memory_registry_ignores_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();

        let registry = NameRegistry::in_memory(dir.path());
        assert_eq!(registry.reserve("clip.mp4").await.unwrap(), "clip.mp4");
        assert_eq!(registry.reserve("clip.mp4").await.unwrap(), "clip (1).mp4");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let registry = NameRegistry::new(dir.path());
        for _ in 0..MAX_DUPLICATE_ATTEMPTS {
            registry.reserve("a.png").await.unwrap();
        }
        assert_eq!(
            registry.reserve("a.png").await,
            Err(RegistryError::ExhaustedAttempts("a.png".to_string()))
        );
        assert_eq!(registry.len().await, MAX_DUPLICATE_ATTEMPTS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("same.png"), b"old").unwrap();
        let registry = Arc::new(NameRegistry::new(dir.path()));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.reserve("same.png").await.unwrap()
            }));
        }

        let mut names = HashSet::new();
        for handle in handles {
            names.insert(handle.await.unwrap());
        }
        assert_eq!(names.len(), 64);
        assert!(!names.contains("same.png"));
    }
}
