//! Queue controller
//!
//! Operation surface over the live queue: restore, play-by-id, add-to-next,
//! remove with single-step undo, move and play/pause. Every operation is
//! total; lookup misses and engine rejections come back as `false` and leave
//! the undo slot and the id cache untouched.
//!
//! After each engine edit the controller compares the engine's timeline
//! generation and current item with what it saw last, refreshes its cached
//! id order, and announces changes on the event bus and the state holder.

use std::sync::Arc;

use mango_common::events::{EventBus, MangoEvent, QueueChangeTrigger};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine::{PlaybackEngine, QueueItem, RepeatMode};
use super::persistence::{LastPlayedStore, LAST_PLAYED_ID, LAST_PLAYED_LIST};
use super::state::PlaybackStateHolder;
use crate::catalog::{CatalogIndex, ReadyState};

/// The most recent removal, kept for one undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoSlot {
    pub removed_index: usize,
    pub item: QueueItem,
    /// Current index at the time of removal
    pub play_index: Option<usize>,
}

/// Point-in-time view of the queue for callers outside the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub item_ids: Vec<String>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub can_revoke: bool,
}

pub struct QueueController<E: PlaybackEngine> {
    engine: E,
    catalog: Arc<CatalogIndex>,
    state: Arc<PlaybackStateHolder>,
    events: EventBus,
    /// Media ids in engine order, refreshed on every timeline change
    original_order_ids: Vec<String>,
    undo: Option<UndoSlot>,
    seen_generation: u64,
    last_current: Option<String>,
}

impl<E: PlaybackEngine> QueueController<E> {
    pub fn new(
        engine: E,
        catalog: Arc<CatalogIndex>,
        state: Arc<PlaybackStateHolder>,
        events: EventBus,
    ) -> Self {
        let original_order_ids = engine.item_ids();
        let seen_generation = engine.timeline_generation();
        let last_current = engine.current_item().map(|item| item.media_id.clone());
        Self {
            engine,
            catalog,
            state,
            events,
            original_order_ids,
            undo: None,
            seen_generation,
            last_current,
        }
    }

    /// Restore the last played queue into an empty engine
    ///
    /// The stored id list is resolved through the catalog, dropping ids it
    /// no longer knows. Without a stored list the whole catalog is queued.
    /// Playback is positioned on the last played item (or the first one)
    /// with repeat-all, prepared but not started. Returns `false` without
    /// touching the engine when it already had a current item or when the
    /// catalog has not been built successfully, so a failed scan cannot
    /// replace the stored list with an empty queue.
    pub async fn load_initial_queue(&mut self, store: &dyn LastPlayedStore) -> bool {
        if self.engine.item_count() > 0 && self.engine.current_index().is_some() {
            debug!("Live queue already populated, skipping restore");
            return false;
        }
        let catalog_state = self.catalog.state();
        if catalog_state != ReadyState::Initialized {
            warn!("Catalog is {}, skipping queue restore", catalog_state);
            return false;
        }

        let stored_list = read_key(store, LAST_PLAYED_LIST).await;
        let last_id = read_key(store, LAST_PLAYED_ID).await;

        let items = self.resolve_stored_list(stored_list);
        let index = last_id
            .and_then(|id| items.iter().position(|item| item.media_id == id))
            .unwrap_or(0);

        info!("Restoring queue of {} items at index {}", items.len(), index);
        self.engine.set_items(items, index);
        self.engine.set_repeat_mode(RepeatMode::All);
        self.engine.prepare();
        self.sync(QueueChangeTrigger::Restore);
        true
    }

    fn resolve_stored_list(&self, stored: Option<String>) -> Vec<QueueItem> {
        let ids = stored.and_then(|json| match serde_json::from_str::<Vec<String>>(&json) {
            Ok(ids) => Some(ids),
            Err(e) => {
                warn!("Ignoring unreadable last played list: {}", e);
                None
            }
        });

        match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.catalog.get_record(id))
                .map(QueueItem::from_record)
                .collect(),
            None => self
                .catalog
                .all_records()
                .into_iter()
                .map(QueueItem::from_record)
                .collect(),
        }
    }

    /// Queue an external locator right after the current item and play it
    pub fn play_by_uri(&mut self, uri: &str) -> bool {
        let index = self.engine.current_index().map_or(0, |current| current + 1);
        let item = QueueItem::from_uri(uri);
        debug!("Playing {} as {} at {}", uri, item.media_id, index);

        let result = self
            .engine
            .add_item(index, item)
            .and_then(|_| self.engine.seek_to(index));
        if let Err(e) = result {
            warn!("Failed to play {}: {}", uri, e);
            self.sync(QueueChangeTrigger::Insert);
            return false;
        }

        self.engine.prepare();
        self.engine.play();
        self.sync(QueueChangeTrigger::Insert);
        true
    }

    /// Seek to `id` in the live queue; returns whether it was found
    pub fn play_by_id(&mut self, id: &str, play_when_ready: bool) -> bool {
        let Some(index) = self.position_of(id) else {
            debug!("play_by_id: {} not in queue", id);
            return false;
        };
        if let Err(e) = self.engine.seek_to(index) {
            warn!("Seek to {} failed: {}", index, e);
            return false;
        }
        if play_when_ready {
            self.engine.prepare();
            self.engine.play();
        }
        self.sync_current();
        true
    }

    /// Make `id` the item played after the current one
    ///
    /// Fails without a current item and when `id` already is the current or
    /// the next item. A queued `id` is moved; otherwise it is resolved
    /// through the catalog and inserted.
    pub fn add_to_next(&mut self, id: &str) -> bool {
        let Some(current) = self.engine.current_index() else {
            return false;
        };

        let now = self.position_of(id);
        if now == Some(current) || now == Some(current + 1) {
            return false;
        }

        match now {
            Some(now) => {
                // Removing an earlier item first shifts the current one down
                let target = if now < current { current } else { current + 1 };
                if let Err(e) = self.engine.move_item(now, target) {
                    warn!("Move {} -> {} failed: {}", now, target, e);
                    return false;
                }
                self.sync(QueueChangeTrigger::Move);
            }
            None => {
                let Some(record) = self.catalog.get_record(id) else {
                    debug!("add_to_next: {} not in catalog", id);
                    return false;
                };
                if let Err(e) = self
                    .engine
                    .add_item(current + 1, QueueItem::from_record(record))
                {
                    warn!("Insert at {} failed: {}", current + 1, e);
                    return false;
                }
                self.sync(QueueChangeTrigger::Insert);
            }
        }
        true
    }

    /// Remove `id` from the queue, remembering it for `revoke_remove`
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let Some(index) = self.position_of(id) else {
            debug!("remove_by_id: {} not in queue", id);
            return false;
        };
        let play_index = self.engine.current_index();

        if play_index == Some(index) {
            self.announce_successor(index);
        }

        match self.engine.remove_item(index) {
            Ok(item) => {
                info!("Removed {} from index {}", item.media_id, index);
                self.events.emit_lossy(MangoEvent::ItemRemoved {
                    item_id: item.media_id.clone(),
                    index,
                    timestamp: chrono::Utc::now(),
                });
                self.undo = Some(UndoSlot {
                    removed_index: index,
                    item,
                    play_index,
                });
                self.sync(QueueChangeTrigger::Remove);
                true
            }
            Err(e) => {
                warn!("Remove at {} failed: {}", index, e);
                false
            }
        }
    }

    /// Publish the item that will become current once `index` is removed
    fn announce_successor(&mut self, index: usize) {
        let Some(next) = self.engine.next_index().filter(|&next| next != index) else {
            return;
        };
        let Some(item) = self.engine.item_at(next) else {
            return;
        };
        let id = item.media_id.clone();
        let index_after = if next > index { next - 1 } else { next };
        self.last_current = Some(id.clone());
        self.publish_transition(Some(id), Some(index_after));
    }

    /// Undo the most recent removal, once
    pub fn revoke_remove(&mut self) -> bool {
        let Some(slot) = self.undo.take() else {
            return false;
        };

        let index = slot.removed_index.min(self.engine.item_count());
        if let Err(e) = self.engine.add_item(index, slot.item.clone()) {
            warn!("Reinsert at {} failed: {}", index, e);
            self.undo = Some(slot);
            return false;
        }
        if slot.play_index == Some(slot.removed_index) {
            if let Err(e) = self.engine.seek_to(index) {
                warn!("Seek to restored index {} failed: {}", index, e);
            }
        }

        info!("Restored {} at index {}", slot.item.media_id, index);
        self.events.emit_lossy(MangoEvent::RemoveRevoked {
            item_id: slot.item.media_id,
            index,
            timestamp: chrono::Utc::now(),
        });
        self.sync(QueueChangeTrigger::Revoke);
        true
    }

    /// Move `id` by `delta` positions; out-of-range targets fail
    pub fn move_by_delta(&mut self, id: &str, delta: isize) -> bool {
        let Some(index) = self.position_of(id) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(delta) else {
            debug!("move_by_delta: {} by {} leaves the queue", id, delta);
            return false;
        };
        if let Err(e) = self.engine.move_item(index, target) {
            debug!("move_by_delta: {}", e);
            return false;
        }
        self.sync(QueueChangeTrigger::Move);
        true
    }

    /// Flip play/pause; returns the resulting playing state
    pub fn toggle_play(&mut self) -> bool {
        if self.engine.is_playing() {
            self.engine.pause();
        } else {
            self.engine.play();
        }
        self.engine.is_playing()
    }

    /// Jump to the next item (wrapping under repeat-all)
    pub fn skip_to_next(&mut self) -> bool {
        if let Err(e) = self.engine.seek_to_next() {
            debug!("skip_to_next: {}", e);
            return false;
        }
        self.sync_current();
        true
    }

    /// The engine moved to another item on its own
    ///
    /// Publishes the current item unconditionally (a repeated item counts
    /// as a transition) and requests a forced state sample.
    pub fn on_media_item_transition(&mut self) {
        self.sync_timeline(QueueChangeTrigger::External);
        let index = self.engine.current_index();
        let id = self.engine.current_item().map(|item| item.media_id.clone());
        self.last_current = id.clone();
        self.publish_transition(id, index);
    }

    /// Run `f` against the engine, then pick up whatever it changed
    pub fn drive_engine<R>(&mut self, f: impl FnOnce(&mut E) -> R) -> R {
        let result = f(&mut self.engine);
        self.sync(QueueChangeTrigger::External);
        result
    }

    /// Pull fresh records from the catalog into queued items
    ///
    /// Called after a rebuild. Items the catalog no longer knows keep their
    /// old record. When the current item changed, observers are notified
    /// again without a transition. Returns how many items were updated.
    pub fn refresh_metadata(&mut self) -> usize {
        let mut updated = 0;
        for index in 0..self.engine.item_count() {
            let Some(item) = self.engine.item_at(index) else {
                continue;
            };
            if item.is_adhoc() {
                continue;
            }
            let Some(record) = self.catalog.get_record(&item.media_id) else {
                continue;
            };
            if item.record.as_ref() == Some(&record) {
                continue;
            }

            let media_id = item.media_id.clone();
            if let Err(e) = self.engine.replace_metadata(index, record) {
                warn!("Failed to refresh metadata of {}: {}", media_id, e);
                continue;
            }
            updated += 1;
            if self.engine.current_index() == Some(index)
                && self.state.republish_if_current(&media_id)
            {
                debug!("Republished current item {} after metadata change", media_id);
            }
        }
        if updated > 0 {
            info!("Refreshed metadata of {} queued items", updated);
        }
        updated
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.original_order_ids.iter().position(|queued| queued == id)
    }

    fn sync(&mut self, trigger: QueueChangeTrigger) {
        self.sync_timeline(trigger);
        self.sync_current();
    }

    fn sync_timeline(&mut self, trigger: QueueChangeTrigger) {
        let generation = self.engine.timeline_generation();
        if generation == self.seen_generation {
            return;
        }
        self.seen_generation = generation;
        self.original_order_ids = self.engine.item_ids();
        debug!(
            "Queue changed ({}): {} items",
            trigger,
            self.original_order_ids.len()
        );
        self.events.emit_lossy(MangoEvent::QueueChanged {
            item_ids: self.original_order_ids.clone(),
            trigger,
            timestamp: chrono::Utc::now(),
        });
    }

    fn sync_current(&mut self) {
        let index = self.engine.current_index();
        let id = self.engine.current_item().map(|item| item.media_id.clone());
        if id != self.last_current {
            self.last_current = id.clone();
            self.publish_transition(id, index);
        }
    }

    fn publish_transition(&self, item_id: Option<String>, index: Option<usize>) {
        debug!("Current item now {:?} at {:?}", item_id, index);
        self.state.set_current_item(item_id.clone());
        self.state.request_sample();
        self.events.emit_lossy(MangoEvent::CurrentItemChanged {
            item_id,
            index,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Cached queue order
    pub fn queue_ids(&self) -> &[String] {
        &self.original_order_ids
    }

    pub fn current_index(&self) -> Option<usize> {
        self.engine.current_index()
    }

    pub fn current_item_id(&self) -> Option<&str> {
        self.engine.current_item().map(|item| item.media_id.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn undo_slot(&self) -> Option<&UndoSlot> {
        self.undo.as_ref()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            item_ids: self.original_order_ids.clone(),
            current_index: self.engine.current_index(),
            is_playing: self.engine.is_playing(),
            can_revoke: self.undo.is_some(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

async fn read_key(store: &dyn LastPlayedStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::local_engine::LocalEngine;
    use mango_common::MediaRecord;

    fn controller(ids: &[&str], current: usize) -> QueueController<LocalEngine> {
        let catalog = Arc::new(CatalogIndex::new());
        catalog
            .rebuild(
                ["1", "2", "3", "4", "5"]
                    .iter()
                    .map(|id| MediaRecord::new(*id, format!("Track {id}")))
                    .collect(),
            )
            .unwrap();

        let mut engine = LocalEngine::new();
        engine.set_items(
            ids.iter()
                .filter_map(|id| catalog.get_record(id))
                .map(QueueItem::from_record)
                .collect(),
            current,
        );
        QueueController::new(
            engine,
            catalog,
            Arc::new(PlaybackStateHolder::new()),
            EventBus::new(64),
        )
    }

    #[test]
    fn test_new_reads_existing_queue() {
        let c = controller(&["1", "2"], 1);
        assert_eq!(c.queue_ids(), ["1", "2"]);
        assert_eq!(c.current_item_id(), Some("2"));
        assert!(c.undo_slot().is_none());
    }

    #[test]
    fn test_miss_leaves_undo_slot_alone() {
        let mut c = controller(&["1", "2", "3"], 0);
        assert!(c.remove_by_id("2"));
        let slot = c.undo_slot().cloned();

        assert!(!c.remove_by_id("nope"));
        assert!(!c.move_by_delta("nope", 1));
        assert!(!c.play_by_id("nope", true));
        assert_eq!(c.undo_slot().cloned(), slot);
        assert_eq!(c.queue_ids(), ["1", "3"]);
    }

    #[test]
    fn test_move_by_negative_delta_past_start_fails() {
        let mut c = controller(&["1", "2", "3"], 0);
        assert!(!c.move_by_delta("2", -2));
        assert!(!c.move_by_delta("2", 2));
        assert_eq!(c.queue_ids(), ["1", "2", "3"]);
    }

    #[test]
    fn test_toggle_play() {
        let mut c = controller(&["1"], 0);
        c.drive_engine(|e| e.prepare());
        assert!(c.toggle_play());
        assert!(!c.toggle_play());
    }

    #[test]
    fn test_skip_to_next_wraps_under_repeat_all() {
        let mut c = controller(&["1", "2"], 1);
        assert!(!c.skip_to_next());
        c.drive_engine(|e| e.set_repeat_mode(RepeatMode::All));
        assert!(c.skip_to_next());
        assert_eq!(c.current_item_id(), Some("1"));
    }
}
