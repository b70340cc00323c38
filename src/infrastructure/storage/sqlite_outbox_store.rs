use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::OutboxEntry;
use crate::domain::value_objects::{SyncedResource, SyncedResourceKind};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[derive(Clone)]
pub struct SqliteOutboxStore {
    pool: ConnectionPool,
}

impl SqliteOutboxStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &SqlitePool {
        self.pool.get_pool()
    }

    fn row_to_entry(row: SqliteRow) -> Result<OutboxEntry, AppError> {
        let kind: String = row.get("resource_kind");
        let lesson_id: String = row.get("lesson_id");
        let attempts: i64 = row.get("attempts");
        let enqueued_at: i64 = row.get("enqueued_at");
        let updated_at: i64 = row.get("updated_at");

        let kind = SyncedResourceKind::parse(&kind).map_err(AppError::DeserializationError)?;
        let resource =
            SyncedResource::new(kind, lesson_id).map_err(AppError::DeserializationError)?;

        Ok(OutboxEntry {
            id: row.get("id"),
            resource,
            content: row.get("content"),
            attempts: attempts.clamp(0, u32::MAX as i64) as u32,
            enqueued_at: from_millis(enqueued_at),
            updated_at: from_millis(updated_at),
            last_error: row.get("last_error"),
        })
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn upsert(
        &self,
        resource: &SyncedResource,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<OutboxEntry, AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_outbox (
                resource_kind,
                lesson_id,
                content,
                attempts,
                enqueued_at,
                updated_at,
                last_error
            ) VALUES (?1, ?2, ?3, 0, ?4, ?4, NULL)
            ON CONFLICT(resource_kind, lesson_id) DO UPDATE SET
                content = excluded.content,
                attempts = 0,
                updated_at = excluded.updated_at,
                last_error = NULL
            "#,
        )
        .bind(resource.kind.as_str())
        .bind(&resource.lesson_id)
        .bind(content)
        .bind(at.timestamp_millis())
        .execute(self.pool())
        .await?;

        self.find(resource)
            .await?
            .ok_or_else(|| AppError::NotFound("Outbox entry missing after upsert".into()))
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<OutboxEntry>, AppError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT id, resource_kind, lesson_id, content, attempts, enqueued_at, updated_at, last_error
            FROM sync_outbox
            ORDER BY enqueued_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn find(&self, resource: &SyncedResource) -> Result<Option<OutboxEntry>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, resource_kind, lesson_id, content, attempts, enqueued_at, updated_at, last_error
            FROM sync_outbox
            WHERE resource_kind = ?1 AND lesson_id = ?2
            "#,
        )
        .bind(resource.kind.as_str())
        .bind(&resource.lesson_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_entry(row)?)),
            None => Ok(None),
        }
    }

    async fn complete(&self, resource: &SyncedResource, content: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sync_outbox
            WHERE resource_kind = ?1 AND lesson_id = ?2 AND content = ?3
            "#,
        )
        .bind(resource.kind.as_str())
        .bind(&resource.lesson_id)
        .bind(content)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sync_outbox WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<u32, AppError> {
        sqlx::query(
            r#"
            UPDATE sync_outbox
            SET attempts = attempts + 1,
                last_error = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(error)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(self.pool())
        .await?;

        let attempts: Option<i64> = sqlx::query_scalar("SELECT attempts FROM sync_outbox WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(attempts.unwrap_or(0).clamp(0, u32::MAX as i64) as u32)
    }

    async fn count(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox")
            .fetch_one(self.pool())
            .await?;
        Ok(count.max(0) as u64)
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
