use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upsert::ExternalRow;

/// A phone call logged in the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_id: String,
    pub contact_external_id: Option<String>,
    pub direction: Option<String>,
    pub status: Option<String>,
    pub duration_secs: Option<i32>,
    pub user_external_id: Option<String>,
    pub called_at: Option<DateTime<Utc>>,
    pub local_date: Option<NaiveDate>,
    pub local_week: Option<NaiveDate>,
    pub local_month: Option<NaiveDate>,
}

impl ExternalRow for DialRow {
    fn account_id(&self) -> Uuid {
        self.account_id
    }

    fn external_id(&self) -> &str {
        &self.external_id
    }
}
