//! In-memory playback engine
//!
//! Keeps the queue, the current index and the play state without producing
//! any audio. Used by the headless binary and by tests; the play state is
//! mirrored into atomics so the sampler can read it from another task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use mango_common::MediaRecord;
use tracing::debug;

use super::engine::{PlaybackEngine, PlaybackProbe, QueueItem, RepeatMode};
use crate::error::EngineError;

/// Play state shared with the sampler
#[derive(Debug, Default)]
pub struct LocalProbe {
    playing: AtomicBool,
    position_ms: AtomicU64,
}

impl PlaybackProbe for LocalProbe {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
pub struct LocalEngine {
    items: Vec<QueueItem>,
    current: Option<usize>,
    repeat: RepeatMode,
    play_when_ready: bool,
    prepared: bool,
    generation: u64,
    probe: Arc<LocalProbe>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate playback progress within the current item
    pub fn set_position_ms(&mut self, position_ms: u64) {
        self.probe.position_ms.store(position_ms, Ordering::Release);
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// The current item finished playing
    ///
    /// Repeat-one restarts the item, otherwise playback moves to the next
    /// index (wrapping under repeat-all). At the end of a non-repeating
    /// queue playback stops on the last item. Returns the new current index.
    pub fn advance(&mut self) -> Option<usize> {
        let current = self.current?;
        match self.repeat {
            RepeatMode::One => self.set_current(Some(current)),
            _ => match self.next_index() {
                Some(next) => self.set_current(Some(next)),
                None => {
                    self.play_when_ready = false;
                    self.sync_probe();
                }
            },
        }
        self.current
    }

    fn set_current(&mut self, index: Option<usize>) {
        self.current = index;
        self.set_position_ms(0);
        self.sync_probe();
    }

    fn sync_probe(&self) {
        let playing = self.play_when_ready && self.prepared && self.current.is_some();
        self.probe.playing.store(playing, Ordering::Release);
    }

    fn timeline_changed(&mut self) {
        self.generation += 1;
        self.sync_probe();
    }

    fn check_index(&self, index: usize) -> Result<(), EngineError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }
}

impl PlaybackEngine for LocalEngine {
    fn is_playing(&self) -> bool {
        self.probe.is_playing()
    }

    fn current_position_ms(&self) -> u64 {
        self.probe.position_ms()
    }

    fn play(&mut self) {
        self.play_when_ready = true;
        self.sync_probe();
    }

    fn pause(&mut self) {
        self.play_when_ready = false;
        self.sync_probe();
    }

    fn prepare(&mut self) {
        self.prepared = true;
        self.sync_probe();
    }

    fn seek_to(&mut self, index: usize) -> Result<(), EngineError> {
        self.check_index(index)?;
        debug!("Seek to index {}", index);
        self.set_current(Some(index));
        Ok(())
    }

    fn add_item(&mut self, index: usize, item: QueueItem) -> Result<(), EngineError> {
        if index > self.items.len() {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items.insert(index, item);
        match self.current {
            None => self.set_current(Some(0)),
            Some(current) if index <= current => self.current = Some(current + 1),
            Some(_) => {}
        }
        self.timeline_changed();
        Ok(())
    }

    fn remove_item(&mut self, index: usize) -> Result<QueueItem, EngineError> {
        self.check_index(index)?;
        let item = self.items.remove(index);
        let len = self.items.len();

        if let Some(current) = self.current {
            if index < current {
                self.current = Some(current - 1);
            } else if index == current {
                let replacement = if len == 0 {
                    None
                } else if current < len {
                    Some(current)
                } else if self.repeat == RepeatMode::All {
                    Some(0)
                } else {
                    Some(len - 1)
                };
                self.set_current(replacement);
            }
        }
        self.timeline_changed();
        Ok(item)
    }

    fn move_item(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);

        if let Some(current) = self.current {
            self.current = Some(if current == from {
                to
            } else if from < current && to >= current {
                current - 1
            } else if from > current && to <= current {
                current + 1
            } else {
                current
            });
        }
        self.timeline_changed();
        Ok(())
    }

    fn set_items(&mut self, items: Vec<QueueItem>, start_index: usize) {
        self.items = items;
        let start = if self.items.is_empty() {
            None
        } else {
            Some(start_index.min(self.items.len() - 1))
        };
        self.set_current(start);
        self.timeline_changed();
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    fn current_index(&self) -> Option<usize> {
        self.current
    }

    fn next_index(&self) -> Option<usize> {
        let current = self.current?;
        if current + 1 < self.items.len() {
            Some(current + 1)
        } else if self.repeat == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    fn replace_metadata(&mut self, index: usize, record: MediaRecord) -> Result<(), EngineError> {
        self.check_index(index)?;
        self.items[index].record = Some(record);
        Ok(())
    }

    fn item_at(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn timeline_generation(&self) -> u64 {
        self.generation
    }

    fn probe(&self) -> Arc<dyn PlaybackProbe> {
        self.probe.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> QueueItem {
        QueueItem::from_record(MediaRecord::new(id, id))
    }

    fn engine(ids: &[&str], current: usize) -> LocalEngine {
        let mut engine = LocalEngine::new();
        engine.set_items(ids.iter().map(|id| item(id)).collect(), current);
        engine
    }

    #[test]
    fn test_insert_before_current_shifts_current() {
        let mut e = engine(&["a", "b", "c"], 1);
        e.add_item(0, item("x")).unwrap();
        assert_eq!(e.current_index(), Some(2));
        assert_eq!(e.current_item().unwrap().media_id, "b");

        e.add_item(3, item("y")).unwrap();
        assert_eq!(e.current_index(), Some(2));
        assert_eq!(e.item_ids(), ["x", "a", "b", "y", "c"]);
    }

    #[test]
    fn test_insert_into_empty_makes_first_current() {
        let mut e = LocalEngine::new();
        assert_eq!(e.current_index(), None);
        e.add_item(0, item("a")).unwrap();
        assert_eq!(e.current_index(), Some(0));
        assert!(e.add_item(5, item("b")).is_err());
    }

    #[test]
    fn test_move_carries_current() {
        let mut e = engine(&["a", "b", "c", "d"], 1);
        e.move_item(1, 3).unwrap();
        assert_eq!(e.item_ids(), ["a", "c", "d", "b"]);
        assert_eq!(e.current_index(), Some(3));

        // Moving another item across the current one
        e.move_item(0, 3).unwrap();
        assert_eq!(e.item_ids(), ["c", "d", "b", "a"]);
        assert_eq!(e.current_item().unwrap().media_id, "b");

        e.move_item(3, 0).unwrap();
        assert_eq!(e.current_item().unwrap().media_id, "b");
        assert!(matches!(
            e.move_item(0, 4),
            Err(EngineError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_remove_current_keeps_index_or_wraps() {
        let mut e = engine(&["a", "b", "c"], 1);
        e.remove_item(1).unwrap();
        assert_eq!(e.current_item().unwrap().media_id, "c");

        e.set_repeat_mode(RepeatMode::All);
        e.remove_item(1).unwrap();
        assert_eq!(e.current_index(), Some(0));

        e.remove_item(0).unwrap();
        assert_eq!(e.current_index(), None);
        assert_eq!(e.item_count(), 0);
    }

    #[test]
    fn test_remove_last_current_without_repeat_stays_on_end() {
        let mut e = engine(&["a", "b", "c"], 2);
        e.remove_item(2).unwrap();
        assert_eq!(e.current_index(), Some(1));
    }

    #[test]
    fn test_next_index_honors_repeat() {
        let mut e = engine(&["a", "b"], 1);
        assert_eq!(e.next_index(), None);
        e.set_repeat_mode(RepeatMode::All);
        assert_eq!(e.next_index(), Some(0));
        e.set_repeat_mode(RepeatMode::One);
        assert_eq!(e.next_index(), None);
    }

    #[test]
    fn test_playing_requires_prepare_and_items() {
        let mut e = engine(&["a"], 0);
        let probe = e.probe();
        e.play();
        assert!(!e.is_playing());
        e.prepare();
        assert!(e.is_playing());
        assert!(probe.is_playing());
        e.pause();
        assert!(!probe.is_playing());
    }

    #[test]
    fn test_advance() {
        let mut e = engine(&["a", "b"], 0);
        e.prepare();
        e.play();
        e.set_position_ms(5_000);

        assert_eq!(e.advance(), Some(1));
        assert_eq!(e.current_position_ms(), 0);

        // End of a non-repeating queue stops playback
        assert_eq!(e.advance(), Some(1));
        assert!(!e.is_playing());

        e.set_repeat_mode(RepeatMode::All);
        e.play();
        assert_eq!(e.advance(), Some(0));
        e.set_repeat_mode(RepeatMode::One);
        assert_eq!(e.advance(), Some(0));
    }

    #[test]
    fn test_edits_bump_generation() {
        let mut e = engine(&["a", "b"], 0);
        let start = e.timeline_generation();
        e.move_item(0, 1).unwrap();
        e.remove_item(0).unwrap();
        e.add_item(0, item("c")).unwrap();
        assert_eq!(e.timeline_generation(), start + 3);

        e.seek_to(1).unwrap();
        e.move_item(1, 1).unwrap();
        assert_eq!(e.timeline_generation(), start + 3);
    }

    #[test]
    fn test_replace_metadata_keeps_timeline() {
        let mut e = engine(&["a", "b"], 0);
        let start = e.timeline_generation();
        let renamed = MediaRecord::new("b", "b (remaster)");

        e.replace_metadata(1, renamed.clone()).unwrap();
        assert_eq!(e.item_at(1).unwrap().record, Some(renamed));
        assert_eq!(e.timeline_generation(), start);
        assert!(e.replace_metadata(2, MediaRecord::new("c", "c")).is_err());
    }
}
