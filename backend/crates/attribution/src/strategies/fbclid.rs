use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsResult;
use salesops_db::attribution::models::AttributionSession;
use salesops_db::attribution::repositories::AttributionRepository;
use uuid::Uuid;

use super::{non_blank, LookupStrategy, StrategyKind};
use crate::engine::AttributionSignals;

pub struct FbclidStrategy;

#[async_trait]
impl LookupStrategy for FbclidStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fbclid
    }

    fn signal<'a>(&self, signals: &'a AttributionSignals) -> Option<&'a str> {
        non_blank(&signals.fbclid)
    }

    async fn lookup(
        &self,
        repo: &dyn AttributionRepository,
        account_id: Uuid,
        value: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        repo.find_by_fbclid(account_id, value, since).await
    }
}
