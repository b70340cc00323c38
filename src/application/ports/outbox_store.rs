use crate::domain::entities::OutboxEntry;
use crate::domain::value_objects::SyncedResource;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable FIFO of local edits that still have to reach the server.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Enqueues `content` for `resource`, replacing the content of an existing entry
    /// while keeping its queue position.
    async fn upsert(
        &self,
        resource: &SyncedResource,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<OutboxEntry, AppError>;

    /// Entries in enqueue order.
    async fn list(&self, limit: Option<u32>) -> Result<Vec<OutboxEntry>, AppError>;

    async fn find(&self, resource: &SyncedResource) -> Result<Option<OutboxEntry>, AppError>;

    /// Removes the entry only if it still carries `content`, so a newer edit is not lost.
    async fn complete(&self, resource: &SyncedResource, content: &str) -> Result<bool, AppError>;

    async fn remove(&self, id: i64) -> Result<bool, AppError>;

    /// Increments the attempt counter and returns the new value.
    async fn record_failure(&self, id: i64, error: &str) -> Result<u32, AppError>;

    async fn count(&self) -> Result<u64, AppError>;
}
