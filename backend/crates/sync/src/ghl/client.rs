use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{
    CalendarsResponse, ContactEnvelope, ContactSearchResponse, EventsResponse, GhlCalendar,
    GhlUser, MessageExportResponse,
};
use crate::error::{SyncError, SyncResult};
use crate::paginate::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE};

pub const DEFAULT_BASE_URL: &str = "https://services.leadconnectorhq.com";
pub const DEFAULT_API_VERSION: &str = "2021-07-28";

#[derive(Debug, Clone)]
pub struct GhlClientConfig {
    pub base_url: String,
    pub token_url: String,
    pub api_version: String,
    /// OAuth app credentials. Without them OAuth accounts keep their stored token.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GhlClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: format!("{DEFAULT_BASE_URL}/oauth/token"),
            api_version: DEFAULT_API_VERSION.to_string(),
            client_id: None,
            client_secret: None,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay_ms: DEFAULT_PAGE_DELAY.as_millis() as u64,
            timeout_secs: 30,
        }
    }
}

impl GhlClientConfig {
    /// Load GHL config from environment, falling back to defaults.
    ///
    /// API-key accounts work without `GHL_CLIENT_ID` / `GHL_CLIENT_SECRET`;
    /// OAuth refresh needs both.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("GHL_BASE_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let token_url = std::env::var("GHL_TOKEN_URL")
            .ok()
            .unwrap_or_else(|| format!("{base_url}/oauth/token"));

        Self {
            base_url,
            token_url,
            api_version: std::env::var("GHL_API_VERSION").unwrap_or(defaults.api_version),
            client_id: std::env::var("GHL_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            client_secret: std::env::var("GHL_CLIENT_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            page_size: parse_env("GHL_PAGE_SIZE").unwrap_or(defaults.page_size),
            page_delay_ms: parse_env("GHL_PAGE_DELAY_MS").unwrap_or(defaults.page_delay_ms),
            timeout_secs: parse_env("GHL_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Thin REST client for the GHL endpoints the sync jobs use.
#[derive(Clone)]
pub struct GhlClient {
    client: Client,
    config: GhlClientConfig,
}

impl GhlClient {
    pub fn new(config: GhlClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: create a client pointing at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn config(&self) -> &GhlClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, token: &str, request: RequestBuilder) -> SyncResult<T> {
        let response = request
            .bearer_auth(token)
            .header("Version", &self.config.api_version)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Http { status, body });
        }
        serde_json::from_str(&body).map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// One page of the contact search, oldest first.
    pub async fn search_contacts(
        &self,
        token: &str,
        location_id: &str,
        page_limit: usize,
        search_after: Option<&serde_json::Value>,
        updated_since: Option<DateTime<Utc>>,
    ) -> SyncResult<ContactSearchResponse> {
        let mut body = serde_json::json!({
            "locationId": location_id,
            "pageLimit": page_limit,
            "sort": [{ "field": "dateAdded", "direction": "asc" }],
        });
        if let Some(after) = search_after {
            body["searchAfter"] = after.clone();
        }
        if let Some(since) = updated_since {
            body["filters"] = serde_json::json!([{
                "field": "dateUpdated",
                "operator": "range",
                "value": { "gte": since.to_rfc3339() },
            }]);
        }

        let request = self.client.post(self.url("/contacts/search")).json(&body);
        self.send(token, request).await
    }

    /// `Ok(None)` when the contact does not exist.
    pub async fn get_contact(
        &self,
        token: &str,
        contact_id: &str,
    ) -> SyncResult<Option<serde_json::Value>> {
        let request = self.client.get(self.url(&format!("/contacts/{contact_id}")));
        match self.send::<ContactEnvelope>(token, request).await {
            Ok(envelope) => Ok(Some(envelope.contact)),
            Err(SyncError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the user does not exist.
    pub async fn get_user(&self, token: &str, user_id: &str) -> SyncResult<Option<GhlUser>> {
        let request = self.client.get(self.url(&format!("/users/{user_id}")));
        match self.send::<GhlUser>(token, request).await {
            Ok(user) => Ok(Some(user)),
            Err(SyncError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_calendars(
        &self,
        token: &str,
        location_id: &str,
    ) -> SyncResult<Vec<GhlCalendar>> {
        let request = self
            .client
            .get(self.url("/calendars/"))
            .query(&[("locationId", location_id)]);
        let response: CalendarsResponse = self.send(token, request).await?;
        Ok(response.calendars)
    }

    pub async fn list_calendar_events(
        &self,
        token: &str,
        location_id: &str,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SyncResult<Vec<serde_json::Value>> {
        let request = self.client.get(self.url("/calendars/events")).query(&[
            ("locationId", location_id.to_string()),
            ("calendarId", calendar_id.to_string()),
            ("startTime", start.timestamp_millis().to_string()),
            ("endTime", end.timestamp_millis().to_string()),
        ]);
        let response: EventsResponse = self.send(token, request).await?;
        Ok(response.events)
    }

    /// One page of exported call messages starting at `offset`.
    pub async fn export_call_messages(
        &self,
        token: &str,
        location_id: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<MessageExportResponse> {
        let request = self
            .client
            .get(self.url("/conversations/messages/export"))
            .query(&[
                ("locationId", location_id.to_string()),
                ("channel", "Call".to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ]);
        self.send(token, request).await
    }
}
