//! Playback queue
//!
//! The controller drives a `PlaybackEngine` and keeps observers informed
//! through the event bus and the `PlaybackStateHolder`, which the sampler
//! feeds with periodic play-state readings.

pub mod controller;
pub mod engine;
pub mod local_engine;
pub mod persistence;
pub mod sampler;
pub mod state;

pub use controller::{QueueController, QueueSnapshot, UndoSlot};
pub use engine::{PlaybackEngine, PlaybackProbe, QueueItem, RepeatMode, ADHOC_PREFIX};
pub use local_engine::{LocalEngine, LocalProbe};
pub use persistence::{
    LastPlayedRecorder, LastPlayedStore, MemoryLastPlayedStore, SqliteLastPlayedStore,
    LAST_PLAYED_ID, LAST_PLAYED_LIST,
};
pub use sampler::{PlaybackSampler, SamplerCore, DEFAULT_SAMPLE_INTERVAL};
pub use state::{PlaybackState, PlaybackStateHolder};
