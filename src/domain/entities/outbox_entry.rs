use crate::domain::value_objects::SyncedResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local edit waiting to reach the server. One entry per resource; later edits replace the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub resource: SyncedResource,
    pub content: String,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}
