//! Queue change type definitions

use serde::{Deserialize, Serialize};

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// Queue replaced wholesale (restore on startup)
    Restore,
    /// Item inserted (play-next, ad-hoc uri)
    Insert,
    /// Item removed by the user
    Remove,
    /// Item moved to another position
    Move,
    /// Removed item put back by undo
    Revoke,
    /// Engine reported a timeline change not caused by this controller
    External,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::Restore => write!(f, "Restore"),
            QueueChangeTrigger::Insert => write!(f, "Insert"),
            QueueChangeTrigger::Remove => write!(f, "Remove"),
            QueueChangeTrigger::Move => write!(f, "Move"),
            QueueChangeTrigger::Revoke => write!(f, "Revoke"),
            QueueChangeTrigger::External => write!(f, "External"),
        }
    }
}
