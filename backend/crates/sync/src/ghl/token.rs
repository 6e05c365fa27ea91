use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use salesops_common::types::Provider;
use salesops_db::accounts::models::{Credential, RefreshedToken};

use super::client::GhlClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::token::{OAuthTokenResponse, TokenExchanger};

/// GHL access tokens are short-lived; refresh shortly before expiry.
pub const GHL_REFRESH_SKEW_MINUTES: i64 = 2;
const GHL_DEFAULT_TTL_HOURS: i64 = 24;

/// Refresh-token grant against the GHL OAuth endpoint.
pub struct GhlTokenExchanger {
    client: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl GhlTokenExchanger {
    pub fn new(config: &GhlClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl TokenExchanger for GhlTokenExchanger {
    fn provider(&self) -> Provider {
        Provider::Ghl
    }

    fn skew(&self) -> Duration {
        Duration::minutes(GHL_REFRESH_SKEW_MINUTES)
    }

    async fn exchange(&self, credential: &Credential) -> SyncResult<RefreshedToken> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| SyncError::Auth("no refresh token stored".to_string()))?;
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => {
                return Err(SyncError::Auth(
                    "GHL_CLIENT_ID / GHL_CLIENT_SECRET not configured".to_string(),
                ))
            }
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("user_type", "Location"),
        ];
        let response = self.client.post(&self.token_url).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Http { status, body });
        }

        let parsed: OAuthTokenResponse =
            serde_json::from_str(&body).map_err(|e| SyncError::Decode(e.to_string()))?;
        Ok(parsed.into_refreshed(Duration::hours(GHL_DEFAULT_TTL_HOURS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghl::client::tests::test_config;
    use crate::token::tests::{oauth_credential, MemoryCredentials};
    use crate::token::TokenManager;
    use chrono::Utc;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchanger(server: &MockServer) -> GhlTokenExchanger {
        let mut config = test_config();
        config.token_url = format!("{}/oauth/token", server.uri());
        GhlTokenExchanger::new(&config).unwrap()
    }

    #[tokio::test]
    async fn exchange_posts_refresh_grant_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("user_type=Location"))
            .and(body_string_contains("client_id=client-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "rotated",
                "expires_in": 86399
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refreshed = exchanger(&server)
            .exchange(&oauth_credential(None))
            .await
            .unwrap();

        assert_eq!(refreshed.access_token, "fresh");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("rotated"));
        assert!(refreshed.expires_at > Utc::now() + Duration::hours(23));
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut credential = oauth_credential(None);
        credential.refresh_token = None;
        let err = exchanger(&server).exchange(&credential).await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn missing_client_credentials_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.token_url = format!("{}/oauth/token", server.uri());
        config.client_secret = None;
        let err = GhlTokenExchanger::new(&config)
            .unwrap()
            .exchange(&oauth_credential(None))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn fresh_token_makes_no_http_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let credential = oauth_credential(Some(Duration::hours(1)));
        let manager = TokenManager::new(MemoryCredentials::with(credential.clone()), exchanger(&server));

        let token = manager.valid_access_token(&credential).await;
        assert_eq!(token.as_deref(), Some("old-access"));
    }

    #[tokio::test]
    async fn expiring_token_refreshes_once_and_persists_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = oauth_credential(Some(Duration::seconds(60)));
        let repo = MemoryCredentials::with(credential.clone());
        let manager = TokenManager::new(repo.clone(), exchanger(&server));

        let first = manager.valid_access_token(&credential).await;
        let stored = repo.get(credential.subject_id);
        let second = manager.valid_access_token(&stored).await;

        assert_eq!(first.as_deref(), Some("fresh"));
        assert_eq!(second.as_deref(), Some("fresh"));
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
        let expires_at = stored.expires_at.unwrap();
        assert!(expires_at > Utc::now() + Duration::minutes(55));
        assert!(expires_at <= Utc::now() + Duration::hours(1));
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn provider_rejection_keeps_stored_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let credential = oauth_credential(Some(Duration::seconds(-5)));
        let repo = MemoryCredentials::with(credential.clone());
        let manager = TokenManager::new(repo.clone(), exchanger(&server));

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("old-access"));
        assert_eq!(repo.saves.load(Ordering::SeqCst), 0);
    }
}
