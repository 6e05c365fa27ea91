use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::sync::models::SyncCheckpoint;
use salesops_common::error::SalesOpsResult;

#[async_trait]
pub trait SyncCheckpointRepository: Send + Sync {
    /// Get or create the checkpoint for a given account+job pair.
    async fn get_or_create(&self, account_id: Uuid, job: &str) -> SalesOpsResult<SyncCheckpoint>;

    /// Atomically set status to 'running' unless another run holds a lease
    /// refreshed within `stale_after`. Returns the checkpoint as it was
    /// before acquisition (so a leftover cursor is visible), or `None` if
    /// the lease is held.
    async fn acquire_lock(
        &self,
        account_id: Uuid,
        job: &str,
        stale_after: Duration,
    ) -> SalesOpsResult<Option<SyncCheckpoint>>;

    /// Persist the cursor of the last committed page; also renews the lease.
    async fn save_cursor(&self, id: Uuid, cursor_value: &str, processed: i64)
        -> SalesOpsResult<()>;

    /// Mark a run as completed: status idle, cursor cleared. `last_synced_at`
    /// moves to `synced_through` when given and is left alone otherwise.
    async fn mark_completed(
        &self,
        id: Uuid,
        processed: i64,
        synced_through: Option<DateTime<Utc>>,
    ) -> SalesOpsResult<SyncCheckpoint>;

    /// Mark a run as failed, keeping the cursor for resume.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> SalesOpsResult<SyncCheckpoint>;
}
