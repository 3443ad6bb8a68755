//! # Mango Common Library
//!
//! Shared code for the Mango player crates including:
//! - Media record model produced by discovery feeds
//! - Event types (MangoEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Settings table access (SQLite)
//! - Timestamp helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod model;
pub mod time;

pub use error::{Error, Result};
pub use model::MediaRecord;
