use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsResult;
use uuid::Uuid;

use crate::attribution::models::AttributionSession;

/// Account-scoped session lookups. Every `find_*` returns the newest match.
#[async_trait]
pub trait AttributionRepository: Send + Sync {
    async fn find_by_session_id(
        &self,
        account_id: Uuid,
        session_id: &str,
    ) -> SalesOpsResult<Option<AttributionSession>>;

    async fn find_by_fbclid(
        &self,
        account_id: Uuid,
        fbclid: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>>;

    /// Case-insensitive on the campaign name.
    async fn find_by_utm_campaign(
        &self,
        account_id: Uuid,
        utm_campaign: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>>;

    async fn find_by_fingerprint(
        &self,
        account_id: Uuid,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>>;
}
