use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use salesops_common::types::Provider;
use salesops_db::accounts::models::{Credential, RefreshedToken};
use salesops_db::accounts::repositories::CredentialRepository;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SyncResult;

/// Provider-specific half of a token refresh.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    fn provider(&self) -> Provider;

    /// How long before expiry a token is already treated as stale.
    fn skew(&self) -> Duration;

    /// Trade the stored credential for a fresh access token.
    async fn exchange(&self, credential: &Credential) -> SyncResult<RefreshedToken>;
}

/// Body shared by the OAuth token endpoints we talk to.
#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl OAuthTokenResponse {
    pub fn into_refreshed(self, default_ttl: Duration) -> RefreshedToken {
        let ttl = self.expires_in.map(Duration::seconds).unwrap_or(default_ttl);
        RefreshedToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + ttl,
        }
    }
}

/// True when the credential has no usable token or is inside the skew window.
pub fn needs_refresh(credential: &Credential, skew: Duration, now: DateTime<Utc>) -> bool {
    match (&credential.access_token, credential.expires_at) {
        (Some(_), Some(expires_at)) => now >= expires_at - skew,
        _ => true,
    }
}

/// Hands out valid bearer tokens, refreshing and persisting them when needed.
///
/// Refreshes are single-flight per account inside one process: concurrent
/// callers queue on a per-account lock and re-read the stored credential
/// once they hold it, so only the first one talks to the provider.
pub struct TokenManager<R, E> {
    repo: R,
    exchanger: E,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl<R, E> TokenManager<R, E>
where
    R: CredentialRepository,
    E: TokenExchanger,
{
    pub fn new(repo: R, exchanger: E) -> Self {
        Self {
            repo,
            exchanger,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.exchanger.provider()
    }

    /// Load the stored credential for `account_id` and return a usable token.
    ///
    /// `Ok(None)` when the account is unknown or holds nothing to authenticate with.
    pub async fn access_token_for(&self, account_id: Uuid) -> SyncResult<Option<String>> {
        let credential = self
            .repo
            .get_credential(account_id, self.provider())
            .await?;
        match credential {
            Some(c) if !c.is_empty() => Ok(self.valid_access_token(&c).await),
            _ => Ok(None),
        }
    }

    /// Return a token for `credential`, refreshing it first if it is stale.
    ///
    /// Never fails: when the refresh cannot happen the stored token is
    /// returned and the provider gets to reject it.
    pub async fn valid_access_token(&self, credential: &Credential) -> Option<String> {
        if !credential.is_oauth() {
            return credential.access_token.clone();
        }

        let skew = self.exchanger.skew();
        if !needs_refresh(credential, skew, Utc::now()) {
            return credential.access_token.clone();
        }

        let lock = self.lock_for(credential.subject_id);
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited.
        let current = match self
            .repo
            .get_credential(credential.subject_id, credential.provider)
            .await
        {
            Ok(Some(c)) => c,
            Ok(None) => credential.clone(),
            Err(e) => {
                tracing::warn!(
                    account_id = %credential.subject_id,
                    error = %e,
                    "could not re-read credential before refresh"
                );
                credential.clone()
            }
        };
        if !needs_refresh(&current, skew, Utc::now()) {
            return current.access_token;
        }

        match self.exchanger.exchange(&current).await {
            Ok(mut refreshed) => {
                if refreshed.refresh_token.is_none() {
                    refreshed.refresh_token = current.refresh_token.clone();
                }
                if let Err(e) = self
                    .repo
                    .save_refreshed(current.subject_id, current.provider, &refreshed)
                    .await
                {
                    tracing::error!(
                        account_id = %current.subject_id,
                        provider = %current.provider,
                        error = %e,
                        "failed to persist refreshed token"
                    );
                }
                tracing::info!(
                    account_id = %current.subject_id,
                    provider = %current.provider,
                    expires_at = %refreshed.expires_at,
                    "access token refreshed"
                );
                Some(refreshed.access_token)
            }
            Err(e) => {
                tracing::warn!(
                    account_id = %current.subject_id,
                    provider = %current.provider,
                    error = %e,
                    "token refresh failed, using stored token"
                );
                current.access_token
            }
        }
    }

    fn lock_for(&self, account_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(account_id).or_default().clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::SyncError;
    use salesops_common::error::SalesOpsResult;
    use salesops_common::types::AuthType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── In-memory CredentialRepository ──────────────────────────

    #[derive(Clone, Default)]
    pub(crate) struct MemoryCredentials {
        pub stored: Arc<Mutex<HashMap<Uuid, Credential>>>,
        pub saves: Arc<AtomicUsize>,
        pub fail_saves: bool,
    }

    impl MemoryCredentials {
        pub fn with(credential: Credential) -> Self {
            let repo = Self::default();
            repo.stored
                .lock()
                .unwrap()
                .insert(credential.subject_id, credential);
            repo
        }

        pub fn get(&self, id: Uuid) -> Credential {
            self.stored.lock().unwrap().get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl CredentialRepository for MemoryCredentials {
        async fn get_credential(
            &self,
            account_id: Uuid,
            _provider: Provider,
        ) -> SalesOpsResult<Option<Credential>> {
            Ok(self.stored.lock().unwrap().get(&account_id).cloned())
        }

        async fn save_refreshed(
            &self,
            account_id: Uuid,
            _provider: Provider,
            token: &RefreshedToken,
        ) -> SalesOpsResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves {
                return Err(salesops_common::error::SalesOpsError::Database(
                    "write failed".to_string(),
                ));
            }
            let mut stored = self.stored.lock().unwrap();
            if let Some(c) = stored.get_mut(&account_id) {
                c.access_token = Some(token.access_token.clone());
                c.refresh_token = token.refresh_token.clone();
                c.expires_at = Some(token.expires_at);
            }
            Ok(())
        }
    }

    // ── Scripted exchanger ──────────────────────────────────────

    struct FakeExchanger {
        calls: Arc<AtomicUsize>,
        fail: bool,
        rotate: bool,
    }

    impl FakeExchanger {
        fn new(calls: Arc<AtomicUsize>) -> Self {
            Self {
                calls,
                fail: false,
                rotate: true,
            }
        }
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        fn provider(&self) -> Provider {
            Provider::Ghl
        }

        fn skew(&self) -> Duration {
            Duration::minutes(2)
        }

        async fn exchange(&self, _credential: &Credential) -> SyncResult<RefreshedToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(SyncError::Auth("invalid_grant".to_string()));
            }
            Ok(RefreshedToken {
                access_token: format!("new-access-{n}"),
                refresh_token: self.rotate.then(|| format!("new-refresh-{n}")),
                expires_at: Utc::now() + Duration::hours(24),
            })
        }
    }

    pub(crate) fn oauth_credential(expires_in: Option<Duration>) -> Credential {
        Credential {
            subject_id: Uuid::new_v4(),
            provider: Provider::Ghl,
            auth_type: AuthType::OAuth,
            access_token: Some("old-access".to_string()),
            refresh_token: Some("old-refresh".to_string()),
            expires_at: expires_in.map(|d| Utc::now() + d),
        }
    }

    #[test]
    fn needs_refresh_respects_skew() {
        let now = Utc::now();
        let skew = Duration::minutes(2);
        let fresh = oauth_credential(Some(Duration::hours(1)));
        assert!(!needs_refresh(&fresh, skew, now));

        let inside_skew = oauth_credential(Some(Duration::seconds(60)));
        assert!(needs_refresh(&inside_skew, skew, now));

        let no_expiry = oauth_credential(None);
        assert!(needs_refresh(&no_expiry, skew, now));

        let mut no_token = oauth_credential(Some(Duration::hours(1)));
        no_token.access_token = None;
        assert!(needs_refresh(&no_token, skew, now));
    }

    #[test]
    fn missing_expires_in_falls_back_to_default_ttl() {
        let body: OAuthTokenResponse =
            serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        let refreshed = body.into_refreshed(Duration::days(60));
        assert!(refreshed.expires_at > Utc::now() + Duration::days(59));
        assert!(refreshed.refresh_token.is_none());
    }

    #[tokio::test]
    async fn api_key_is_returned_without_io() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut credential = oauth_credential(None);
        credential.auth_type = AuthType::ApiKey;
        credential.access_token = Some("static-key".to_string());
        let repo = MemoryCredentials::with(credential.clone());
        let manager = TokenManager::new(repo.clone(), FakeExchanger::new(calls.clone()));

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("static-key"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_io() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(Some(Duration::hours(2)));
        let repo = MemoryCredentials::with(credential.clone());
        let manager = TokenManager::new(repo, FakeExchanger::new(calls.clone()));

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("old-access"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_and_persisted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(Some(Duration::seconds(30)));
        let repo = MemoryCredentials::with(credential.clone());
        let manager = TokenManager::new(repo.clone(), FakeExchanger::new(calls.clone()));

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("new-access-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stored = repo.get(credential.subject_id);
        assert_eq!(stored.access_token.as_deref(), Some("new-access-1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("new-refresh-1"));
        assert!(stored.expires_at.unwrap() > Utc::now() + Duration::hours(23));
    }

    #[tokio::test]
    async fn unrotated_refresh_token_is_carried_over() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(None);
        let repo = MemoryCredentials::with(credential.clone());
        let mut exchanger = FakeExchanger::new(calls);
        exchanger.rotate = false;
        let manager = TokenManager::new(repo.clone(), exchanger);

        manager.valid_access_token(&credential).await;

        let stored = repo.get(credential.subject_id);
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_stored_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(Some(Duration::seconds(-10)));
        let repo = MemoryCredentials::with(credential.clone());
        let mut exchanger = FakeExchanger::new(calls.clone());
        exchanger.fail = true;
        let manager = TokenManager::new(repo.clone(), exchanger);

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("old-access"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistence_failure_still_returns_new_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(None);
        let mut repo = MemoryCredentials::with(credential.clone());
        repo.fail_saves = true;
        let manager = TokenManager::new(repo.clone(), FakeExchanger::new(calls));

        let token = manager.valid_access_token(&credential).await;

        assert_eq!(token.as_deref(), Some("new-access-1"));
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_refresh_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = oauth_credential(Some(Duration::seconds(5)));
        let repo = MemoryCredentials::with(credential.clone());
        let manager = Arc::new(TokenManager::new(
            repo.clone(),
            FakeExchanger::new(calls.clone()),
        ));

        let (a, b, c) = tokio::join!(
            manager.valid_access_token(&credential),
            manager.valid_access_token(&credential),
            manager.valid_access_token(&credential),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.as_deref(), Some("new-access-1"));
        assert_eq!(b, a);
        assert_eq!(c, a);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn access_token_for_unknown_account_is_none() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = TokenManager::new(MemoryCredentials::default(), FakeExchanger::new(calls));
        let token = manager.access_token_for(Uuid::new_v4()).await.unwrap();
        assert!(token.is_none());
    }
}
