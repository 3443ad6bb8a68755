//! Manifest discovery feed
//!
//! Reads a JSON array of media records from disk. The manifest is produced
//! by an external scanner; this feed only filters and normalizes it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mango_common::MediaRecord;
use tracing::debug;

use super::{DiscoveryFeed, ScanFilter};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ManifestFeed {
    path: PathBuf,
    filter: ScanFilter,
}

impl ManifestFeed {
    pub fn new(path: impl Into<PathBuf>, filter: ScanFilter) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiscoveryFeed for ManifestFeed {
    async fn scan(&self) -> Result<Vec<MediaRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Discovery(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let records: Vec<MediaRecord> = serde_json::from_str(&content).map_err(|e| {
            Error::Discovery(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        let total = records.len();
        let kept = self.filter.apply(records);
        debug!(
            "Manifest {}: {} records, {} after filtering",
            self.path.display(),
            total,
            kept.len()
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_filters_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.json");
        let records = vec![
            MediaRecord::new("1", "kept").with_duration_ms(45_000).with_genre("folk"),
            MediaRecord::new("2", "too short").with_duration_ms(1_000),
        ];
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let feed = ManifestFeed::new(&path, ScanFilter::default());
        let scanned = feed.scan().await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, "1");
        assert_eq!(scanned[0].genre.as_deref(), Some("Folk"));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_discovery_error() {
        let temp_dir = TempDir::new().unwrap();
        let feed = ManifestFeed::new(temp_dir.path().join("none.json"), ScanFilter::none());
        assert!(matches!(feed.scan().await, Err(Error::Discovery(_))));
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_discovery_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.json");
        std::fs::write(&path, "{ not a list").unwrap();

        let feed = ManifestFeed::new(&path, ScanFilter::none());
        assert!(matches!(feed.scan().await, Err(Error::Discovery(_))));
    }
}
