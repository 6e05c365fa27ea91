use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::sync::models::SyncCheckpoint;
use crate::sync::repositories::SyncCheckpointRepository;
use salesops_common::error::{SalesOpsError, SalesOpsResult};

const CHECKPOINT_COLUMNS: &str = "id, account_id, job, cursor_value, status, processed, \
     error_message, last_synced_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgSyncCheckpointRepository {
    pool: PgPool,
}

impl PgSyncCheckpointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> SyncCheckpoint {
        SyncCheckpoint {
            id: row.get("id"),
            account_id: row.get("account_id"),
            job: row.get("job"),
            cursor_value: row.get("cursor_value"),
            status: row.get("status"),
            processed: row.get("processed"),
            error_message: row.get("error_message"),
            last_synced_at: row.get("last_synced_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl SyncCheckpointRepository for PgSyncCheckpointRepository {
    async fn get_or_create(&self, account_id: Uuid, job: &str) -> SalesOpsResult<SyncCheckpoint> {
        let row = sqlx::query(&format!(
            "insert into sync_checkpoints (id, account_id, job)
             values ($1, $2, $3)
             on conflict (account_id, job) do update set updated_at = sync_checkpoints.updated_at
             returning {CHECKPOINT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(job)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(Self::map_row(row))
    }

    async fn acquire_lock(
        &self,
        account_id: Uuid,
        job: &str,
        stale_after: Duration,
    ) -> SalesOpsResult<Option<SyncCheckpoint>> {
        let now = Utc::now();
        // The CTE snapshot reflects the row before the update, so the caller
        // sees the previous status alongside any leftover cursor.
        let row = sqlx::query(&format!(
            "with prev as (
               select {CHECKPOINT_COLUMNS} from sync_checkpoints
               where account_id = $2 and job = $3
             )
             update sync_checkpoints sc
             set status = 'running', error_message = null, updated_at = $1
             from prev
             where sc.id = prev.id
               and (sc.status != 'running' or sc.updated_at < $4)
             returning prev.id, prev.account_id, prev.job, prev.cursor_value, prev.status,
                       prev.processed, prev.error_message, prev.last_synced_at,
                       prev.created_at, prev.updated_at"
        ))
        .bind(now)
        .bind(account_id)
        .bind(job)
        .bind(now - stale_after)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(row.map(Self::map_row))
    }

    async fn save_cursor(
        &self,
        id: Uuid,
        cursor_value: &str,
        processed: i64,
    ) -> SalesOpsResult<()> {
        sqlx::query(
            "update sync_checkpoints
             set cursor_value = $1, processed = $2, updated_at = $3
             where id = $4",
        )
        .bind(cursor_value)
        .bind(processed)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        processed: i64,
        synced_through: Option<DateTime<Utc>>,
    ) -> SalesOpsResult<SyncCheckpoint> {
        let row = sqlx::query(&format!(
            "update sync_checkpoints
             set status = 'idle', last_synced_at = coalesce($1, last_synced_at),
                 cursor_value = null, processed = $2, error_message = null, updated_at = $3
             where id = $4
             returning {CHECKPOINT_COLUMNS}"
        ))
        .bind(synced_through)
        .bind(processed)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(Self::map_row(row))
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> SalesOpsResult<SyncCheckpoint> {
        let row = sqlx::query(&format!(
            "update sync_checkpoints
             set status = 'failed', error_message = $1, updated_at = $2
             where id = $3
             returning {CHECKPOINT_COLUMNS}"
        ))
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(Self::map_row(row))
    }
}
