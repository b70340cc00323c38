use crate::application::ports::blob_store::BlobStore;
use crate::domain::entities::{CacheEntry, CacheStats};
use crate::domain::value_objects::{CacheKey, ResourceKind};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::StorageConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info, warn};

/// Limits applied to unpinned entries. `None` disables the corresponding rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub max_bytes: Option<u64>,
    pub ttl: Option<Duration>,
}

impl EvictionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.max_bytes.is_some() || self.ttl.is_some()
    }
}

impl From<&StorageConfig> for EvictionPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_bytes: (config.max_cache_bytes > 0).then_some(config.max_cache_bytes),
            ttl: (config.cache_ttl_secs > 0)
                .then(|| Duration::seconds(config.cache_ttl_secs.min(i64::MAX as u64) as i64)),
        }
    }
}

#[derive(Clone)]
pub struct SqliteBlobStore {
    pool: ConnectionPool,
    policy: EvictionPolicy,
}

impl SqliteBlobStore {
    pub fn new(pool: ConnectionPool, policy: EvictionPolicy) -> Self {
        Self { pool, policy }
    }

    fn pool(&self) -> &SqlitePool {
        self.pool.get_pool()
    }

    fn row_to_entry(row: SqliteRow) -> Result<CacheEntry, AppError> {
        let key: String = row.get("cache_key");
        let payload: Vec<u8> = row.get("payload");
        let kind: String = row.get("resource_kind");
        let pinned: bool = row.get("pinned");
        let stored_at: i64 = row.get("stored_at");

        Ok(CacheEntry {
            key: CacheKey::new(key).map_err(AppError::DeserializationError)?,
            payload,
            stored_at: from_millis(stored_at),
            resource_kind: ResourceKind::parse(&kind).map_err(AppError::DeserializationError)?,
            pinned,
        })
    }

    async fn store(
        &self,
        key: &CacheKey,
        payload: &[u8],
        kind: ResourceKind,
        pinned: bool,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        // Single upsert statement: the row is replaced as a whole or not at all.
        sqlx::query(
            r#"
            INSERT INTO blob_entries (
                cache_key,
                payload,
                resource_kind,
                pinned,
                payload_bytes,
                stored_at,
                last_accessed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(cache_key) DO UPDATE SET
                payload = excluded.payload,
                resource_kind = excluded.resource_kind,
                pinned = MAX(blob_entries.pinned, excluded.pinned),
                payload_bytes = excluded.payload_bytes,
                stored_at = excluded.stored_at,
                last_accessed_at = excluded.last_accessed_at
            "#,
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(kind.as_str())
        .bind(pinned)
        .bind(payload.len() as i64)
        .bind(now_ms)
        .execute(self.pool())
        .await?;

        debug!(key = %key, kind = %kind, bytes = payload.len(), pinned, "blob stored");

        if self.policy.is_active() {
            if let Err(err) = self.evict_except(now, Some(key)).await {
                warn!("Cache eviction after put failed: {}", err);
            }
        }

        Ok(())
    }

    async fn total_bytes(&self) -> Result<u64, AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(payload_bytes), 0) FROM blob_entries")
                .fetch_one(self.pool())
                .await?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(
        &self,
        key: &CacheKey,
        payload: &[u8],
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        self.store(key, payload, kind, false).await
    }

    async fn put_pinned(
        &self,
        key: &CacheKey,
        payload: &[u8],
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        self.store(key, payload, kind, true).await
    }

    async fn pin(&self, key: &CacheKey) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE blob_entries SET pinned = 1 WHERE cache_key = ?1")
            .bind(key.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT cache_key, payload, resource_kind, pinned, stored_at
            FROM blob_entries
            WHERE cache_key = ?1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let entry = Self::row_to_entry(row)?;

        if let Err(err) = sqlx::query("UPDATE blob_entries SET last_accessed_at = ?1 WHERE cache_key = ?2")
            .bind(Utc::now().timestamp_millis())
            .bind(key.as_str())
            .execute(self.pool())
            .await
        {
            debug!("Failed to refresh access time for {}: {}", key, err);
        }

        Ok(Some(entry))
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool, AppError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM blob_entries WHERE cache_key = ?1")
                .bind(key.as_str())
                .fetch_optional(self.pool())
                .await?;
        Ok(found.is_some())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blob_entries WHERE cache_key = ?1")
            .bind(key.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_all(&self, kind: Option<ResourceKind>) -> Result<u64, AppError> {
        let keys = self.keys(kind).await?;
        let mut removed = 0u64;

        for key in keys {
            match self.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => warn!("Failed to delete cached entry {}: {}", key, err),
            }
        }

        info!(
            removed,
            scope = kind.map(|k| k.as_str()).unwrap_or("all"),
            "blob store cleared"
        );
        Ok(removed)
    }

    async fn keys(&self, kind: Option<ResourceKind>) -> Result<Vec<CacheKey>, AppError> {
        let rows: Vec<String> = match kind {
            Some(kind) => {
                sqlx::query_scalar(
                    "SELECT cache_key FROM blob_entries WHERE resource_kind = ?1 ORDER BY cache_key",
                )
                .bind(kind.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT cache_key FROM blob_entries ORDER BY cache_key")
                    .fetch_all(self.pool())
                    .await?
            }
        };

        rows.into_iter()
            .map(|key| CacheKey::new(key).map_err(AppError::DeserializationError))
            .collect()
    }

    async fn stats(&self) -> Result<CacheStats, AppError> {
        let (count, bytes, pinned): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(payload_bytes), 0), COALESCE(SUM(pinned), 0)
            FROM blob_entries
            "#,
        )
        .fetch_one(self.pool())
        .await?;

        Ok(CacheStats {
            entry_count: count.max(0) as u64,
            total_bytes: bytes.max(0) as u64,
            pinned_count: pinned.max(0) as u64,
        })
    }

    async fn evict(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.evict_except(now, None).await
    }
}

impl SqliteBlobStore {
    /// TTL pass, then LRU until under budget. `keep` is never chosen as an LRU victim, so a
    /// payload larger than the whole budget still survives the write that stored it.
    async fn evict_except(
        &self,
        now: DateTime<Utc>,
        keep: Option<&CacheKey>,
    ) -> Result<u64, AppError> {
        let mut removed = 0u64;

        if let Some(ttl) = self.policy.ttl {
            let cutoff = (now - ttl).timestamp_millis();
            let result = sqlx::query(
                r#"
                DELETE FROM blob_entries
                WHERE pinned = 0 AND resource_kind != ?1 AND stored_at < ?2
                "#,
            )
            .bind(ResourceKind::NoteDraft.as_str())
            .bind(cutoff)
            .execute(self.pool())
            .await?;
            removed += result.rows_affected();
        }

        if let Some(max_bytes) = self.policy.max_bytes {
            let mut total = self.total_bytes().await?;
            if total > max_bytes {
                let candidates: Vec<(String, i64)> = sqlx::query_as(
                    r#"
                    SELECT cache_key, payload_bytes
                    FROM blob_entries
                    WHERE pinned = 0 AND resource_kind != ?1 AND cache_key != ?2
                    ORDER BY last_accessed_at ASC, stored_at ASC, rowid ASC
                    "#,
                )
                .bind(ResourceKind::NoteDraft.as_str())
                .bind(keep.map(CacheKey::as_str).unwrap_or_default())
                .fetch_all(self.pool())
                .await?;

                for (key, bytes) in candidates {
                    if total <= max_bytes {
                        break;
                    }
                    let result = sqlx::query("DELETE FROM blob_entries WHERE cache_key = ?1")
                        .bind(&key)
                        .execute(self.pool())
                        .await?;
                    if result.rows_affected() > 0 {
                        removed += 1;
                        total = total.saturating_sub(bytes.max(0) as u64);
                    }
                }

                if total > max_bytes {
                    debug!(
                        total,
                        max_bytes, "cache still over budget; remaining entries are pinned, notes or fresh"
                    );
                }
            }
        }

        if removed > 0 {
            info!(removed, "evicted cached entries");
        }
        Ok(removed)
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
