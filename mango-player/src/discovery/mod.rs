//! Media discovery
//!
//! Discovery feeds turn some storage (a manifest file, a fixed list) into
//! flat `MediaRecord`s. The refresher rebuilds the catalog whenever a feed
//! reports that its storage changed.

pub mod manifest;
pub mod refresh;
pub mod watch;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use mango_common::config::ScanConfig;
use mango_common::model::UNKNOWN_ARTIST;
use mango_common::MediaRecord;

use crate::error::Result;

pub use manifest::ManifestFeed;
pub use refresh::{CatalogRefresher, RefreshTrigger};
pub use watch::ManifestWatcher;

/// Source of media records
#[async_trait]
pub trait DiscoveryFeed: Send + Sync {
    /// Produce the current full record list
    async fn scan(&self) -> Result<Vec<MediaRecord>>;
}

/// Rules deciding which discovered records are cataloged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub min_duration_ms: u64,
    pub min_size_bytes: u64,
    pub hide_unknown_artist: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanFilter {
    fn from(config: &ScanConfig) -> Self {
        Self {
            min_duration_ms: config.min_duration_ms,
            min_size_bytes: config.min_size_bytes,
            hide_unknown_artist: config.hide_unknown_artist,
        }
    }
}

impl ScanFilter {
    /// Accept everything
    pub fn none() -> Self {
        Self {
            min_duration_ms: 0,
            min_size_bytes: 0,
            hide_unknown_artist: false,
        }
    }

    pub fn accepts(&self, record: &MediaRecord) -> bool {
        record.duration_ms >= self.min_duration_ms
            && record.size_bytes >= self.min_size_bytes
            && !(self.hide_unknown_artist && record.artist == UNKNOWN_ARTIST)
    }

    /// Drop rejected records and normalize genres of the rest
    pub fn apply(&self, records: Vec<MediaRecord>) -> Vec<MediaRecord> {
        records
            .into_iter()
            .filter(|r| self.accepts(r))
            .map(|mut r| {
                r.genre = normalize_genre(r.genre.as_deref());
                r
            })
            .collect()
    }
}

/// Trim the genre, drop it when blank, upper-case its first character
pub fn normalize_genre(genre: Option<&str>) -> Option<String> {
    let genre = genre?.trim();
    let mut chars = genre.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Feed over an in-memory list that can be swapped at runtime
#[derive(Debug, Default)]
pub struct StaticFeed {
    records: Mutex<Vec<MediaRecord>>,
}

impl StaticFeed {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Replace the list; the next scan returns the new records
    pub fn replace(&self, records: Vec<MediaRecord>) {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records;
    }
}

#[async_trait]
impl DiscoveryFeed for StaticFeed {
    async fn scan(&self) -> Result<Vec<MediaRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
