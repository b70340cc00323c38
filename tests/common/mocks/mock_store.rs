use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lms_offline::application::ports::BlobStore;
use lms_offline::domain::entities::{CacheEntry, CacheStats};
use lms_offline::domain::value_objects::{CacheKey, ResourceKind};
use lms_offline::AppError;

/// Blob store whose every operation fails, as with a full or unreadable disk.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    writes: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn read_attempts(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn write_failed(&self) -> AppError {
        self.writes.fetch_add(1, Ordering::SeqCst);
        AppError::Database("disk full".into())
    }

    fn read_failed(&self) -> AppError {
        self.reads.fetch_add(1, Ordering::SeqCst);
        AppError::Database("disk unreadable".into())
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, _: &CacheKey, _: &[u8], _: ResourceKind) -> Result<(), AppError> {
        Err(self.write_failed())
    }

    async fn put_pinned(&self, _: &CacheKey, _: &[u8], _: ResourceKind) -> Result<(), AppError> {
        Err(self.write_failed())
    }

    async fn pin(&self, _: &CacheKey) -> Result<bool, AppError> {
        Err(self.write_failed())
    }

    async fn get(&self, _: &CacheKey) -> Result<Option<CacheEntry>, AppError> {
        Err(self.read_failed())
    }

    async fn contains(&self, _: &CacheKey) -> Result<bool, AppError> {
        Err(self.read_failed())
    }

    async fn delete(&self, _: &CacheKey) -> Result<bool, AppError> {
        Err(self.write_failed())
    }

    async fn clear_all(&self, _: Option<ResourceKind>) -> Result<u64, AppError> {
        Err(self.write_failed())
    }

    async fn keys(&self, _: Option<ResourceKind>) -> Result<Vec<CacheKey>, AppError> {
        Err(self.read_failed())
    }

    async fn stats(&self) -> Result<CacheStats, AppError> {
        Err(self.read_failed())
    }

    async fn evict(&self, _: DateTime<Utc>) -> Result<u64, AppError> {
        Err(self.write_failed())
    }
}
