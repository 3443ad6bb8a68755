//! # Mango Player Library (mango-player)
//!
//! Media catalog index and playback-queue engine.
//!
//! **Purpose:** Turn a flat list of discovered audio items into a browsable
//! album/artist/genre catalog with race-free rebuilds, and maintain the
//! playback queue with positional edits, single-step undo and a sampled,
//! observable playback state.
//!
//! **Architecture:** discovery feed -> `CatalogIndex` -> `QueueController`
//! (owned by a `PlaybackSession` task) -> `PlaybackStateHolder` observers.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod playback;
pub mod session;

pub use catalog::CatalogIndex;
pub use error::{Error, Result};
pub use playback::{PlaybackStateHolder, QueueController};
pub use session::{PlaybackSession, QueueHandle};
