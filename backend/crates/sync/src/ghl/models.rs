use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Contact as returned by `POST /contacts/search` and `GET /contacts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlContact {
    pub id: String,
    pub contact_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub timezone: Option<String>,
    /// Passed through as-is; absent or null becomes `[]`.
    #[serde(default = "empty_list", deserialize_with = "null_as_empty_list")]
    pub tags: serde_json::Value,
    #[serde(default = "empty_list", deserialize_with = "null_as_empty_list")]
    pub custom_fields: serde_json::Value,
    pub attribution_source: Option<serde_json::Value>,
    pub date_added: Option<DateTime<Utc>>,
}

fn empty_list() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

fn null_as_empty_list<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_list() } else { value })
}

#[derive(Debug, Deserialize)]
pub struct ContactSearchResponse {
    #[serde(default)]
    pub contacts: Vec<serde_json::Value>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ContactEnvelope {
    pub contact: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlUser {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhlCalendar {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarsResponse {
    #[serde(default)]
    pub calendars: Vec<GhlCalendar>,
}

#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Calendar event from `GET /calendars/events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlEvent {
    pub id: String,
    pub calendar_id: Option<String>,
    pub contact_id: Option<String>,
    pub title: Option<String>,
    pub appointment_status: Option<String>,
    pub assigned_user_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_by: Option<GhlCreatedBy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlCreatedBy {
    pub user_id: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageExportResponse {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    pub total: Option<u64>,
}

/// Call entry from `GET /conversations/messages/export`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlCallMessage {
    pub id: String,
    pub contact_id: Option<String>,
    pub direction: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub date_added: Option<DateTime<Utc>>,
    pub meta: Option<GhlMessageMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhlMessageMeta {
    pub call: Option<GhlCallMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhlCallMeta {
    pub duration: Option<i32>,
    pub status: Option<String>,
}
