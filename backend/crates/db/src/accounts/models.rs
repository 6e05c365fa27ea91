use chrono::{DateTime, Utc};
use salesops_common::types::{AuthType, Provider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. All synced data is isolated by `account_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    /// IANA timezone used when a record carries none of its own.
    pub timezone: Option<String>,
    pub ghl_location_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider credential stored on the account row.
///
/// For `AuthType::ApiKey` the static key lives in `access_token` and the
/// expiry/refresh fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub subject_id: Uuid,
    pub provider: Provider,
    pub auth_type: AuthType,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_oauth(&self) -> bool {
        self.auth_type == AuthType::OAuth
    }

    /// True when there is nothing at all to authenticate with.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Result of a successful token exchange, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}
