//! Playback engine contract
//!
//! The queue controller drives an engine it does not own the internals of:
//! it issues positional edits and seeks, and samples the play state. Engine
//! calls are synchronous and must happen on the task that owns the engine.

use std::sync::Arc;

use mango_common::MediaRecord;
use serde::Serialize;
use uuid::Uuid;

use crate::error::EngineError;

/// Prefix of ids minted for items that did not come from the catalog
pub const ADHOC_PREFIX: &str = "adhoc:";

/// What happens at the end of the last item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Replay the current item
    One,
    /// Wrap around to the first item
    All,
}

/// One entry of the live queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub media_id: String,
    /// Locator handed to the decoder
    pub source_locator: String,
    /// Catalog record, absent for ad-hoc items
    pub record: Option<MediaRecord>,
}

impl QueueItem {
    pub fn from_record(record: MediaRecord) -> Self {
        Self {
            media_id: record.id.clone(),
            source_locator: record.source_locator.clone(),
            record: Some(record),
        }
    }

    /// Item for an externally supplied locator, with a fresh unique id
    pub fn from_uri(uri: &str) -> Self {
        Self {
            media_id: format!("{ADHOC_PREFIX}{}", Uuid::new_v4()),
            source_locator: uri.to_string(),
            record: None,
        }
    }

    pub fn is_adhoc(&self) -> bool {
        self.record.is_none()
    }

    /// Display title; falls back to the locator for ad-hoc items
    pub fn title(&self) -> &str {
        self.record
            .as_ref()
            .map(|r| r.title.as_str())
            .unwrap_or(&self.source_locator)
    }
}

/// Lock-free view of the play state, safe to read from any thread
pub trait PlaybackProbe: Send + Sync {
    fn is_playing(&self) -> bool;
    fn position_ms(&self) -> u64;
}

/// A playback engine as seen by the queue controller
///
/// Indices are zero based. Edits follow list semantics: inserting at or
/// before the current index shifts it up, removing before it shifts it down,
/// and moving the current item carries the current index along with it.
/// Every edit that changes the item order bumps `timeline_generation`.
pub trait PlaybackEngine: Send {
    fn is_playing(&self) -> bool;
    fn current_position_ms(&self) -> u64;

    fn play(&mut self);
    fn pause(&mut self);
    fn prepare(&mut self);

    /// Make `index` current, starting from its default position
    fn seek_to(&mut self, index: usize) -> Result<(), EngineError>;

    /// Insert `item` so that it ends up at `index`; `index == item_count()` appends
    fn add_item(&mut self, index: usize, item: QueueItem) -> Result<(), EngineError>;

    fn remove_item(&mut self, index: usize) -> Result<QueueItem, EngineError>;

    /// Remove the item at `from` and reinsert it at `to`
    fn move_item(&mut self, from: usize, to: usize) -> Result<(), EngineError>;

    /// Swap the metadata of the item at `index`; order and generation are unchanged
    fn replace_metadata(&mut self, index: usize, record: MediaRecord) -> Result<(), EngineError>;

    /// Replace the whole queue and position it at `start_index`
    fn set_items(&mut self, items: Vec<QueueItem>, start_index: usize);

    fn set_repeat_mode(&mut self, mode: RepeatMode);
    fn repeat_mode(&self) -> RepeatMode;

    fn current_index(&self) -> Option<usize>;

    /// Index playback would move to next, honoring repeat-all wrap around
    fn next_index(&self) -> Option<usize>;

    fn item_at(&self, index: usize) -> Option<&QueueItem>;
    fn item_count(&self) -> usize;

    /// Changes whenever the item order changes
    fn timeline_generation(&self) -> u64;

    /// Shared probe for the state sampler
    fn probe(&self) -> Arc<dyn PlaybackProbe>;

    /// Seek to the next item, if there is one
    fn seek_to_next(&mut self) -> Result<(), EngineError> {
        let next = self.next_index().ok_or(EngineError::EmptyQueue)?;
        self.seek_to(next)
    }

    fn current_item(&self) -> Option<&QueueItem> {
        self.current_index().and_then(|i| self.item_at(i))
    }

    /// Media ids in queue order
    fn item_ids(&self) -> Vec<String> {
        (0..self.item_count())
            .filter_map(|i| self.item_at(i))
            .map(|item| item.media_id.clone())
            .collect()
    }
}
