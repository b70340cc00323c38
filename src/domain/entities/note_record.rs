use crate::domain::value_objects::{SyncStatus, SyncedResource, SyncedResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local copy of a user-authored record (lesson note or completion marker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub lesson_id: String,
    pub kind: SyncedResourceKind,
    pub content: String,
    pub sync_status: SyncStatus,
    pub last_local_edit: DateTime<Utc>,
}

impl NoteRecord {
    pub fn pending(resource: &SyncedResource, content: String, edited_at: DateTime<Utc>) -> Self {
        Self {
            lesson_id: resource.lesson_id.clone(),
            kind: resource.kind,
            content,
            sync_status: SyncStatus::PendingLocal,
            last_local_edit: edited_at,
        }
    }

    pub fn resource(&self) -> SyncedResource {
        SyncedResource {
            kind: self.kind,
            lesson_id: self.lesson_id.clone(),
        }
    }

    pub fn mark_synced(&mut self) {
        self.sync_status = SyncStatus::Synced;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Body of the note endpoints: `GET` returns it, `PUT` sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub content: String,
}
