use std::collections::HashSet;

use chrono::{Duration, Utc};
use salesops_common::error::SalesOpsResult;
use salesops_db::attribution::models::AttributionSession;
use salesops_db::attribution::repositories::AttributionRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AttributionConfig;
use crate::trace::{AttemptOutcome, MatchTrace};

/// Identifiers captured from a lead that may point back to an ad session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributionSignals {
    pub session_id: Option<String>,
    pub fbclid: Option<String>,
    pub utm_campaign: Option<String>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttributionMatch {
    pub session: Option<AttributionSession>,
    pub trace: MatchTrace,
}

/// Try each configured strategy in order and return the first session found.
///
/// Strategies whose signal is blank are skipped without touching storage.
/// A storage error aborts the whole match.
pub async fn match_session(
    repo: &dyn AttributionRepository,
    account_id: Uuid,
    signals: &AttributionSignals,
    config: &AttributionConfig,
) -> SalesOpsResult<AttributionMatch> {
    let since = Utc::now() - Duration::days(config.lookback_days);
    let mut trace = MatchTrace::default();
    let mut seen = HashSet::new();

    for kind in &config.priority {
        if !seen.insert(*kind) {
            continue;
        }

        let strategy = kind.strategy();
        let value = match strategy.signal(signals) {
            Some(v) => v,
            None => {
                trace.record(*kind, AttemptOutcome::Skipped);
                continue;
            }
        };

        match strategy.lookup(repo, account_id, value, since).await? {
            Some(session) => {
                trace.record(*kind, AttemptOutcome::Hit);
                tracing::debug!(
                    %account_id,
                    strategy = kind.as_str(),
                    session = %session.id,
                    "attribution session matched"
                );
                return Ok(AttributionMatch {
                    session: Some(session),
                    trace,
                });
            }
            None => trace.record(*kind, AttemptOutcome::Miss),
        }
    }

    tracing::debug!(%account_id, attempts = trace.attempts.len(), "no attribution session matched");
    Ok(AttributionMatch {
        session: None,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::StrategyKind;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    // -- In-memory AttributionRepository -----------------------------------

    #[derive(Default)]
    struct MemoryRepo {
        sessions: Vec<AttributionSession>,
        queries: Mutex<Vec<&'static str>>,
    }

    impl MemoryRepo {
        fn with(sessions: Vec<AttributionSession>) -> Self {
            Self {
                sessions,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn newest<F>(&self, account_id: Uuid, since: Option<DateTime<Utc>>, pred: F) -> Option<AttributionSession>
        where
            F: Fn(&AttributionSession) -> bool,
        {
            self.sessions
                .iter()
                .filter(|s| s.account_id == account_id)
                .filter(|s| since.map_or(true, |t| s.created_at >= t))
                .filter(|s| pred(s))
                .max_by_key(|s| s.created_at)
                .cloned()
        }
    }

    #[async_trait]
    impl AttributionRepository for MemoryRepo {
        async fn find_by_session_id(
            &self,
            account_id: Uuid,
            session_id: &str,
        ) -> SalesOpsResult<Option<AttributionSession>> {
            self.queries.lock().unwrap().push("session_id");
            Ok(self.newest(account_id, None, |s| {
                s.session_id.as_deref() == Some(session_id)
            }))
        }

        async fn find_by_fbclid(
            &self,
            account_id: Uuid,
            fbclid: &str,
            since: DateTime<Utc>,
        ) -> SalesOpsResult<Option<AttributionSession>> {
            self.queries.lock().unwrap().push("fbclid");
            Ok(self.newest(account_id, Some(since), |s| s.fbclid.as_deref() == Some(fbclid)))
        }

        async fn find_by_utm_campaign(
            &self,
            account_id: Uuid,
            utm_campaign: &str,
            since: DateTime<Utc>,
        ) -> SalesOpsResult<Option<AttributionSession>> {
            self.queries.lock().unwrap().push("utm_campaign");
            Ok(self.newest(account_id, Some(since), |s| {
                s.utm_campaign
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(utm_campaign))
            }))
        }

        async fn find_by_fingerprint(
            &self,
            account_id: Uuid,
            fingerprint: &str,
            since: DateTime<Utc>,
        ) -> SalesOpsResult<Option<AttributionSession>> {
            self.queries.lock().unwrap().push("fingerprint");
            Ok(self.newest(account_id, Some(since), |s| {
                s.fingerprint.as_deref() == Some(fingerprint)
            }))
        }
    }

    fn make_session(account_id: Uuid, days_ago: i64) -> AttributionSession {
        AttributionSession {
            id: Uuid::new_v4(),
            account_id,
            session_id: None,
            fbclid: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            fingerprint: None,
            ad_id: None,
            campaign_id: None,
            landing_url: None,
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn session_id_wins_over_fbclid() {
        let account = Uuid::new_v4();
        let mut by_session = make_session(account, 1);
        by_session.session_id = Some("sess-1".to_string());
        let mut by_click = make_session(account, 0);
        by_click.fbclid = Some("fb-1".to_string());
        let repo = MemoryRepo::with(vec![by_session.clone(), by_click]);

        let signals = AttributionSignals {
            session_id: Some("sess-1".to_string()),
            fbclid: Some("fb-1".to_string()),
            ..Default::default()
        };
        let result = match_session(&repo, account, &signals, &AttributionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.session.unwrap().id, by_session.id);
        assert_eq!(result.trace.matched, Some(StrategyKind::SessionId));
        assert_eq!(*repo.queries.lock().unwrap(), vec!["session_id"]);
    }

    #[tokio::test]
    async fn falls_through_misses_in_priority_order() {
        let account = Uuid::new_v4();
        let mut s = make_session(account, 2);
        s.fingerprint = Some("fp-9".to_string());
        let repo = MemoryRepo::with(vec![s.clone()]);

        let signals = AttributionSignals {
            session_id: Some("unknown".to_string()),
            fbclid: Some("fb-unknown".to_string()),
            utm_campaign: Some("nope".to_string()),
            fingerprint: Some("fp-9".to_string()),
        };
        let result = match_session(&repo, account, &signals, &AttributionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.session.unwrap().id, s.id);
        assert_eq!(
            *repo.queries.lock().unwrap(),
            vec!["session_id", "fbclid", "utm_campaign", "fingerprint"]
        );
        let outcomes: Vec<AttemptOutcome> =
            result.trace.attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                AttemptOutcome::Miss,
                AttemptOutcome::Miss,
                AttemptOutcome::Miss,
                AttemptOutcome::Hit
            ]
        );
    }

    #[tokio::test]
    async fn blank_signals_are_skipped_without_queries() {
        let account = Uuid::new_v4();
        let repo = MemoryRepo::with(Vec::new());
        let signals = AttributionSignals {
            session_id: Some("   ".to_string()),
            ..Default::default()
        };

        let result = match_session(&repo, account, &signals, &AttributionConfig::default())
            .await
            .unwrap();

        assert!(result.session.is_none());
        assert!(result.trace.matched.is_none());
        assert!(result.trace.queried().is_empty());
        assert!(repo.queries.lock().unwrap().is_empty());
        assert_eq!(result.trace.attempts.len(), 4);
    }

    #[tokio::test]
    async fn utm_campaign_matches_case_insensitively() {
        let account = Uuid::new_v4();
        let mut s = make_session(account, 3);
        s.utm_campaign = Some("Spring_Promo".to_string());
        let repo = MemoryRepo::with(vec![s.clone()]);

        let signals = AttributionSignals {
            utm_campaign: Some(" spring_promo ".to_string()),
            ..Default::default()
        };
        let result = match_session(&repo, account, &signals, &AttributionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.trace.matched, Some(StrategyKind::UtmCampaign));
    }

    #[tokio::test]
    async fn lookback_window_bounds_fuzzy_strategies_only() {
        let account = Uuid::new_v4();
        let mut old = make_session(account, 90);
        old.session_id = Some("sess-old".to_string());
        old.fbclid = Some("fb-old".to_string());
        let repo = MemoryRepo::with(vec![old.clone()]);

        let by_click = AttributionSignals {
            fbclid: Some("fb-old".to_string()),
            ..Default::default()
        };
        let miss = match_session(&repo, account, &by_click, &AttributionConfig::default())
            .await
            .unwrap();
        assert!(miss.session.is_none());

        let by_session = AttributionSignals {
            session_id: Some("sess-old".to_string()),
            ..Default::default()
        };
        let hit = match_session(&repo, account, &by_session, &AttributionConfig::default())
            .await
            .unwrap();
        assert_eq!(hit.session.unwrap().id, old.id);
    }

    #[tokio::test]
    async fn custom_priority_is_respected_and_repeats_ignored() {
        let account = Uuid::new_v4();
        let mut s = make_session(account, 1);
        s.fbclid = Some("fb-1".to_string());
        s.fingerprint = Some("fp-1".to_string());
        let repo = MemoryRepo::with(vec![s]);

        let config = AttributionConfig {
            priority: vec![
                StrategyKind::Fingerprint,
                StrategyKind::Fingerprint,
                StrategyKind::Fbclid,
            ],
            lookback_days: 30,
        };
        let signals = AttributionSignals {
            fbclid: Some("fb-1".to_string()),
            fingerprint: Some("fp-1".to_string()),
            ..Default::default()
        };
        let result = match_session(&repo, account, &signals, &config).await.unwrap();

        assert_eq!(result.trace.matched, Some(StrategyKind::Fingerprint));
        assert_eq!(result.trace.attempts.len(), 1);
    }

    #[tokio::test]
    async fn other_accounts_sessions_never_match() {
        let mut s = make_session(Uuid::new_v4(), 0);
        s.fbclid = Some("fb-1".to_string());
        let repo = MemoryRepo::with(vec![s]);

        let signals = AttributionSignals {
            fbclid: Some("fb-1".to_string()),
            ..Default::default()
        };
        let result = match_session(&repo, Uuid::new_v4(), &signals, &AttributionConfig::default())
            .await
            .unwrap();
        assert!(result.session.is_none());
    }
}
