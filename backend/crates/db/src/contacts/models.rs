use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upsert::ExternalRow;

/// A CRM contact mirrored locally, unique per `(account_id, external_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub timezone: Option<String>,
    pub tags: serde_json::Value,
    pub custom_fields: serde_json::Value,
    pub attribution: serde_json::Value,
    pub date_added: Option<DateTime<Utc>>,
    pub local_date: Option<NaiveDate>,
    pub local_week: Option<NaiveDate>,
    pub local_month: Option<NaiveDate>,
}

impl ExternalRow for ContactRow {
    fn account_id(&self) -> Uuid {
        self.account_id
    }

    fn external_id(&self) -> &str {
        &self.external_id
    }
}
