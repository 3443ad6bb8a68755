//! Observable playback state
//!
//! One holder per playback session. The controller publishes item
//! transitions, the sampler publishes play-state readings; observers
//! subscribe to a `watch` channel and always see the latest value.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{watch, Notify};

/// Snapshot published to observers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub current_item_id: Option<String>,
    pub position_ms: u64,
    pub is_playing: bool,
}

pub struct PlaybackStateHolder {
    tx: watch::Sender<PlaybackState>,
    sample_requested: Notify,
    samples_published: AtomicU64,
}

impl PlaybackStateHolder {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PlaybackState::default());
        Self {
            tx,
            sample_requested: Notify::new(),
            samples_published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Latest published state
    pub fn get(&self) -> PlaybackState {
        self.tx.borrow().clone()
    }

    /// Publish an item transition; observers are notified even if the id repeats
    pub fn set_current_item(&self, item_id: Option<String>) {
        self.tx.send_modify(|state| state.current_item_id = item_id);
    }

    /// Publish one sampler reading
    pub fn publish_sample(&self, is_playing: bool, position_ms: u64) {
        self.tx.send_modify(|state| {
            state.is_playing = is_playing;
            state.position_ms = position_ms;
        });
        self.samples_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Re-notify observers when `item_id` is current, e.g. after its metadata changed
    pub fn republish_if_current(&self, item_id: &str) -> bool {
        self.tx
            .send_if_modified(|state| state.current_item_id.as_deref() == Some(item_id))
    }

    /// Ask the sampler for an immediate forced reading
    ///
    /// A request made while no sampler is waiting is kept until one is.
    pub fn request_sample(&self) {
        self.sample_requested.notify_one();
    }

    /// Resolves when a forced reading was requested
    pub async fn sample_requested(&self) {
        self.sample_requested.notified().await;
    }

    /// Number of sampler readings published so far
    pub fn samples_published(&self) -> u64 {
        self.samples_published.load(Ordering::Relaxed)
    }
}

impl Default for PlaybackStateHolder {
    fn default() -> Self {
        Self::new()
    }
}
