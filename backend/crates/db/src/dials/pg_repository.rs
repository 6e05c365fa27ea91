use async_trait::async_trait;
use salesops_common::error::{SalesOpsError, SalesOpsResult};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::dials::models::DialRow;
use crate::dials::repositories::DialRepository;
use crate::upsert::BatchUpsert;

#[derive(Clone)]
pub struct PgDialRepository {
    pool: PgPool,
}

impl PgDialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchUpsert<DialRow> for PgDialRepository {
    async fn upsert_batch(&self, rows: &[DialRow]) -> SalesOpsResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "insert into dials
             (id, account_id, external_id, contact_external_id, direction, status,
              duration_secs, user_external_id, called_at, local_date, local_week, local_month) ",
        );

        qb.push_values(rows, |mut b, d| {
            b.push_bind(d.id)
                .push_bind(d.account_id)
                .push_bind(d.external_id.clone())
                .push_bind(d.contact_external_id.clone())
                .push_bind(d.direction.clone())
                .push_bind(d.status.clone())
                .push_bind(d.duration_secs)
                .push_bind(d.user_external_id.clone())
                .push_bind(d.called_at)
                .push_bind(d.local_date)
                .push_bind(d.local_week)
                .push_bind(d.local_month);
        });

        qb.push(
            " on conflict (account_id, external_id) do update set
               contact_external_id = excluded.contact_external_id,
               direction = excluded.direction,
               status = excluded.status,
               duration_secs = excluded.duration_secs,
               user_external_id = excluded.user_external_id,
               called_at = excluded.called_at,
               local_date = excluded.local_date,
               local_week = excluded.local_week,
               local_month = excluded.local_month,
               updated_at = now()",
        );

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}

impl DialRepository for PgDialRepository {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use uuid::Uuid;

    async fn test_repo() -> Option<PgDialRepository> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url, 2).await.expect("db should connect");

        sqlx::query(
            "create table if not exists dials (
               id uuid primary key,
               account_id uuid not null,
               external_id text not null,
               contact_external_id text,
               direction text,
               status text,
               duration_secs integer,
               user_external_id text,
               called_at timestamptz,
               local_date date,
               local_week date,
               local_month date,
               created_at timestamptz not null default now(),
               updated_at timestamptz not null default now(),
               unique (account_id, external_id)
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        Some(PgDialRepository::new(pool))
    }

    async fn count_rows(repo: &PgDialRepository, account_id: Uuid) -> i64 {
        sqlx::query_scalar("select count(*) from dials where account_id = $1")
            .bind(account_id)
            .fetch_one(&repo.pool)
            .await
            .expect("count")
    }

    fn dial(account_id: Uuid, external_id: &str) -> DialRow {
        DialRow {
            id: Uuid::new_v4(),
            account_id,
            external_id: external_id.to_string(),
            contact_external_id: Some("c-1".to_string()),
            direction: Some("outbound".to_string()),
            status: Some("completed".to_string()),
            duration_secs: Some(95),
            user_external_id: Some("u-1".to_string()),
            called_at: None,
            local_date: None,
            local_week: None,
            local_month: None,
        }
    }

    #[tokio::test]
    async fn repeated_upsert_keeps_one_row_per_external_id() {
        let repo = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let account = Uuid::new_v4();
        let rows = vec![dial(account, "m-1"), dial(account, "m-2")];

        repo.upsert_batch(&rows).await.expect("first");
        repo.upsert_batch(&rows).await.expect("second");

        assert_eq!(count_rows(&repo, account).await, 2);
    }
}
