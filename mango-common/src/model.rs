//! Media record model
//!
//! A `MediaRecord` is the flat, immutable description of one playable audio
//! item as produced by a discovery feed. Catalog and queue code wrap records
//! but never mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artist name reported by media scanners when the tag is missing
pub const UNKNOWN_ARTIST: &str = "<unknown>";

/// One discovered audio item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Stable identifier assigned by the discovery source
    pub id: String,
    pub title: String,
    pub album: String,
    pub album_id: String,
    pub artist: String,
    pub artist_id: String,
    /// Genre tag, absent when the source has none
    #[serde(default)]
    pub genre: Option<String>,
    pub duration_ms: u64,
    /// Opaque locator (URI or path) handed to the playback engine
    pub source_locator: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub date_added: DateTime<Utc>,
}

impl MediaRecord {
    /// Create a record with the given identity fields and empty metadata
    ///
    /// Mostly useful for tests and ad-hoc items; discovery feeds deserialize
    /// complete records instead.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            source_locator: id.clone(),
            id,
            title: title.into(),
            album: String::new(),
            album_id: String::new(),
            artist: String::new(),
            artist_id: String::new(),
            genre: None,
            duration_ms: 0,
            size_bytes: 0,
            date_added: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn with_album(mut self, album_id: impl Into<String>, album: impl Into<String>) -> Self {
        self.album_id = album_id.into();
        self.album = album.into();
        self
    }

    pub fn with_artist(mut self, artist_id: impl Into<String>, artist: impl Into<String>) -> Self {
        self.artist_id = artist_id.into();
        self.artist = artist.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = date_added;
        self
    }

    /// Genre with blank tags treated as absent
    pub fn genre_tag(&self) -> Option<&str> {
        self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }
}
