use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable sync flag stored with each locally authored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    PendingLocal,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::PendingLocal => "pending_local",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SyncStatus::PendingLocal)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-resource synchronizer state, including the in-flight phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Unsynced,
    Syncing,
    Synced,
}

impl From<SyncStatus> for SyncState {
    fn from(status: SyncStatus) -> Self {
        match status {
            SyncStatus::Synced => SyncState::Synced,
            SyncStatus::PendingLocal => SyncState::Unsynced,
        }
    }
}
