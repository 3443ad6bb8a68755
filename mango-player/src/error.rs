//! Error types for mango-player
//!
//! Module-specific error types using thiserror. Queue operations never
//! surface these to callers; they are logged and turned into `false` at the
//! controller boundary.

use thiserror::Error;

/// Catalog rebuild failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A record that cannot be placed in the tree
    #[error("Invalid media record: {0}")]
    InvalidRecord(String),

    /// The discovery feed failed to produce records
    #[error("Discovery failed: {0}")]
    Discovery(String),
}

/// Failures reported by a playback engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Index outside the current queue bounds
    #[error("Index {index} out of range for queue of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Operation requires at least one queued item
    #[error("Queue is empty")]
    EmptyQueue,
}

/// Main error type for mango-player
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog build errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] IndexError),

    /// Discovery feed errors (manifest read/parse, watcher setup)
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Playback engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Last-played store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library (database, config)
    #[error(transparent)]
    Common(#[from] mango_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session task gone or channel closed
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using mango-player Error
pub type Result<T> = std::result::Result<T, Error>;
