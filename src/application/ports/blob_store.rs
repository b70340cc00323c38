use crate::domain::entities::{CacheEntry, CacheStats};
use crate::domain::value_objects::{CacheKey, ResourceKind};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable key -> snapshot store shared by the gateway, the download manager and the synchronizer.
///
/// Every write replaces the whole entry; readers never observe a partial payload.
/// Absence is a normal outcome and is reported as `Ok(None)`, never as an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an opportunistic snapshot that eviction may later drop.
    async fn put(&self, key: &CacheKey, payload: &[u8], kind: ResourceKind)
        -> Result<(), AppError>;

    /// Stores an explicitly downloaded snapshot that eviction never drops.
    async fn put_pinned(
        &self,
        key: &CacheKey,
        payload: &[u8],
        kind: ResourceKind,
    ) -> Result<(), AppError>;

    /// Marks an existing entry as pinned. Returns `false` when the key is absent.
    async fn pin(&self, key: &CacheKey) -> Result<bool, AppError>;

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, AppError>;

    async fn contains(&self, key: &CacheKey) -> Result<bool, AppError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, AppError>;

    /// Removes every entry, or only entries of `kind`. Per-entry failures are logged and skipped.
    async fn clear_all(&self, kind: Option<ResourceKind>) -> Result<u64, AppError>;

    async fn keys(&self, kind: Option<ResourceKind>) -> Result<Vec<CacheKey>, AppError>;

    async fn stats(&self) -> Result<CacheStats, AppError>;

    /// Applies the TTL and size bound to unpinned entries. Returns the number removed.
    async fn evict(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
