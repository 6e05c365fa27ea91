pub mod fbclid;
pub mod fingerprint;
pub mod session_id;
pub mod utm;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsResult;
use salesops_db::attribution::models::AttributionSession;
use salesops_db::attribution::repositories::AttributionRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::AttributionSignals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SessionId,
    Fbclid,
    UtmCampaign,
    Fingerprint,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::SessionId => "session_id",
            StrategyKind::Fbclid => "fbclid",
            StrategyKind::UtmCampaign => "utm_campaign",
            StrategyKind::Fingerprint => "fingerprint",
        }
    }

    pub fn strategy(&self) -> Box<dyn LookupStrategy> {
        match self {
            StrategyKind::SessionId => Box::new(session_id::SessionIdStrategy),
            StrategyKind::Fbclid => Box::new(fbclid::FbclidStrategy),
            StrategyKind::UtmCampaign => Box::new(utm::UtmCampaignStrategy),
            StrategyKind::Fingerprint => Box::new(fingerprint::FingerprintStrategy),
        }
    }
}

#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// The value this strategy keys on, or `None` to skip it.
    fn signal<'a>(&self, signals: &'a AttributionSignals) -> Option<&'a str>;

    async fn lookup(
        &self,
        repo: &dyn AttributionRepository,
        account_id: Uuid,
        value: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>>;
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
