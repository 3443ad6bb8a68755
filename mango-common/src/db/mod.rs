//! Database access
//!
//! Mango keeps a single key/value `settings` table; the last-played
//! queue state lives there.

pub mod init;
pub mod settings;

pub use init::*;
pub use settings::*;
