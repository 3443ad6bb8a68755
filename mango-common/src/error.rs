//! Common error types for Mango

use thiserror::Error;

/// Common result type for Mango operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Mango crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML or stored setting that cannot be read
    #[error("Configuration error: {0}")]
    Config(String),
}
