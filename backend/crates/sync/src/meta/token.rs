use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use salesops_common::types::Provider;
use salesops_db::accounts::models::{Credential, RefreshedToken};

use super::MetaClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::token::{OAuthTokenResponse, TokenExchanger};

/// Long-lived Meta tokens are re-exchanged a day before they lapse.
pub const META_REFRESH_SKEW_HOURS: i64 = 24;
const META_DEFAULT_TTL_DAYS: i64 = 60;

/// `fb_exchange_token` grant: trades the current token for a new long-lived one.
pub struct MetaTokenExchanger {
    client: Client,
    config: MetaClientConfig,
}

impl MetaTokenExchanger {
    pub fn new(config: MetaClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TokenExchanger for MetaTokenExchanger {
    fn provider(&self) -> Provider {
        Provider::Meta
    }

    fn skew(&self) -> Duration {
        Duration::hours(META_REFRESH_SKEW_HOURS)
    }

    async fn exchange(&self, credential: &Credential) -> SyncResult<RefreshedToken> {
        let current = credential
            .access_token
            .as_deref()
            .ok_or_else(|| SyncError::Auth("no Meta token to exchange".to_string()))?;

        let response = self
            .client
            .get(format!("{}/oauth/access_token", self.config.graph_url))
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", self.config.app_id.as_str()),
                ("client_secret", self.config.app_secret.as_str()),
                ("fb_exchange_token", current),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Http { status, body });
        }

        let parsed: OAuthTokenResponse =
            serde_json::from_str(&body).map_err(|e| SyncError::Decode(e.to_string()))?;
        Ok(parsed.into_refreshed(Duration::days(META_DEFAULT_TTL_DAYS)))
    }
}
