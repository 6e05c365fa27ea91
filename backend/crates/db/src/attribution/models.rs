use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked landing-page visit carrying ad click identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSession {
    pub id: Uuid,
    pub account_id: Uuid,
    pub session_id: Option<String>,
    pub fbclid: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub fingerprint: Option<String>,
    pub ad_id: Option<String>,
    pub campaign_id: Option<String>,
    pub landing_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
