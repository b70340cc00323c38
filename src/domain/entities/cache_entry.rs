use crate::domain::value_objects::{CacheKey, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A whole-resource snapshot held by the blob store. Always replaced atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Vec<u8>,
    pub stored_at: DateTime<Utc>,
    pub resource_kind: ResourceKind,
    /// Pinned entries were downloaded explicitly and are exempt from eviction.
    pub pinned: bool,
}

impl CacheEntry {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub total_bytes: u64,
    pub pinned_count: u64,
}
