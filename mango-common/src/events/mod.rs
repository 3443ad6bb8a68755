//! Event types for the Mango event system
//!
//! Provides the shared event definitions and the EventBus used by the
//! catalog refresher, the queue controller and any observer (persistence,
//! UI bridges).

mod queue_types;

pub use queue_types::QueueChangeTrigger;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Mango event types
///
/// Events are broadcast via EventBus and can be serialized for external
/// observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MangoEvent {
    /// A catalog rebuild settled
    ///
    /// Triggers:
    /// - UI: refresh library views
    CatalogRebuilt {
        /// False when the rebuild settled in the error state
        ok: bool,
        /// Number of playable items in the published tree
        item_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The live queue order changed
    ///
    /// Triggers:
    /// - Persistence: save last played list
    /// - UI: redraw playlist
    QueueChanged {
        /// Media ids in play order
        item_ids: Vec<String>,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The item the engine considers current changed
    ///
    /// Triggers:
    /// - Persistence: save last played id
    CurrentItemChanged {
        /// None when the queue became empty
        item_id: Option<String>,
        index: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An item was removed and remembered for undo
    ItemRemoved {
        item_id: String,
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The last removal was undone
    RemoveRevoked {
        item_id: String,
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MangoEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            MangoEvent::CatalogRebuilt { .. } => "CatalogRebuilt",
            MangoEvent::QueueChanged { .. } => "QueueChanged",
            MangoEvent::CurrentItemChanged { .. } => "CurrentItemChanged",
            MangoEvent::ItemRemoved { .. } => "ItemRemoved",
            MangoEvent::RemoveRevoked { .. } => "RemoveRevoked",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use mango_common::events::{EventBus, MangoEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(MangoEvent::CatalogRebuilt {
///     ok: true,
///     item_count: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(MangoEvent::CatalogRebuilt { ok: true, .. })));
/// ```
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<MangoEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MangoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MangoEvent) {
        let _ = self.tx.send(event);
    }
}
