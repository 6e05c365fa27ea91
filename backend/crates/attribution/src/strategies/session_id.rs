use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsResult;
use salesops_db::attribution::models::AttributionSession;
use salesops_db::attribution::repositories::AttributionRepository;
use uuid::Uuid;

use super::{non_blank, LookupStrategy, StrategyKind};
use crate::engine::AttributionSignals;

/// Exact tracking-session id. Not bounded by the lookback window.
pub struct SessionIdStrategy;

#[async_trait]
impl LookupStrategy for SessionIdStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SessionId
    }

    fn signal<'a>(&self, signals: &'a AttributionSignals) -> Option<&'a str> {
        non_blank(&signals.session_id)
    }

    async fn lookup(
        &self,
        repo: &dyn AttributionRepository,
        account_id: Uuid,
        value: &str,
        _since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        repo.find_by_session_id(account_id, value).await
    }
}
