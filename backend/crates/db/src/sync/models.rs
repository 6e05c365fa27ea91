use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_IDLE: &str = "idle";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_FAILED: &str = "failed";

/// Durable progress of one sync job for one account.
///
/// `cursor_value` is the last committed page cursor; it is cleared when a
/// run completes and kept when a run fails so the next run can resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub id: Uuid,
    pub account_id: Uuid,
    pub job: String,
    pub cursor_value: Option<String>,
    pub status: String,
    pub processed: i64,
    pub error_message: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncCheckpoint {
    /// Cursor to continue from, if the previous run stopped part-way.
    pub fn resume_cursor(&self) -> Option<&str> {
        if self.status == STATUS_IDLE {
            return None;
        }
        self.cursor_value.as_deref()
    }
}
