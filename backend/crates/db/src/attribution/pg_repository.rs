use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesops_common::error::{SalesOpsError, SalesOpsResult};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::attribution::models::AttributionSession;
use crate::attribution::repositories::AttributionRepository;

const SESSION_COLUMNS: &str = "id, account_id, session_id, fbclid, utm_source, utm_medium, \
     utm_campaign, fingerprint, ad_id, campaign_id, landing_url, created_at";

#[derive(Clone)]
pub struct PgAttributionRepository {
    pool: PgPool,
}

impl PgAttributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> AttributionSession {
        AttributionSession {
            id: row.get("id"),
            account_id: row.get("account_id"),
            session_id: row.get("session_id"),
            fbclid: row.get("fbclid"),
            utm_source: row.get("utm_source"),
            utm_medium: row.get("utm_medium"),
            utm_campaign: row.get("utm_campaign"),
            fingerprint: row.get("fingerprint"),
            ad_id: row.get("ad_id"),
            campaign_id: row.get("campaign_id"),
            landing_url: row.get("landing_url"),
            created_at: row.get("created_at"),
        }
    }

    async fn find_newest(
        &self,
        predicate: &str,
        account_id: Uuid,
        value: &str,
        since: Option<DateTime<Utc>>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        let sql = format!(
            "select {SESSION_COLUMNS} from attribution_sessions
             where account_id = $1 and {predicate}
               and ($3::timestamptz is null or created_at >= $3)
             order by created_at desc
             limit 1"
        );

        let row = sqlx::query(&sql)
            .bind(account_id)
            .bind(value)
            .bind(since)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(row.map(Self::map_row))
    }
}

#[async_trait]
impl AttributionRepository for PgAttributionRepository {
    async fn find_by_session_id(
        &self,
        account_id: Uuid,
        session_id: &str,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        self.find_newest("session_id = $2", account_id, session_id, None)
            .await
    }

    async fn find_by_fbclid(
        &self,
        account_id: Uuid,
        fbclid: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        self.find_newest("fbclid = $2", account_id, fbclid, Some(since))
            .await
    }

    async fn find_by_utm_campaign(
        &self,
        account_id: Uuid,
        utm_campaign: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        self.find_newest(
            "lower(utm_campaign) = lower($2)",
            account_id,
            utm_campaign,
            Some(since),
        )
        .await
    }

    async fn find_by_fingerprint(
        &self,
        account_id: Uuid,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> SalesOpsResult<Option<AttributionSession>> {
        self.find_newest("fingerprint = $2", account_id, fingerprint, Some(since))
            .await
    }
}
