use async_trait::async_trait;
use salesops_common::error::{SalesOpsError, SalesOpsResult};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::contacts::models::ContactRow;
use crate::contacts::repositories::ContactRepository;
use crate::upsert::BatchUpsert;

const CONTACT_COLUMNS: &str = "id, account_id, external_id, name, first_name, last_name, email, phone, \
     source, timezone, tags, custom_fields, attribution, date_added, local_date, local_week, local_month";

#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> ContactRow {
        ContactRow {
            id: row.get("id"),
            account_id: row.get("account_id"),
            external_id: row.get("external_id"),
            name: row.get("name"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            source: row.get("source"),
            timezone: row.get("timezone"),
            tags: row.get("tags"),
            custom_fields: row.get("custom_fields"),
            attribution: row.get("attribution"),
            date_added: row.get("date_added"),
            local_date: row.get("local_date"),
            local_week: row.get("local_week"),
            local_month: row.get("local_month"),
        }
    }
}

#[async_trait]
impl BatchUpsert<ContactRow> for PgContactRepository {
    /// Upsert contacts (idempotent on account_id + external_id). The local
    /// `id` of an existing row is preserved; every mapped field is overwritten.
    async fn upsert_batch(&self, rows: &[ContactRow]) -> SalesOpsResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("insert into contacts ({CONTACT_COLUMNS}) "));

        qb.push_values(rows, |mut b, c| {
            b.push_bind(c.id)
                .push_bind(c.account_id)
                .push_bind(c.external_id.clone())
                .push_bind(c.name.clone())
                .push_bind(c.first_name.clone())
                .push_bind(c.last_name.clone())
                .push_bind(c.email.clone())
                .push_bind(c.phone.clone())
                .push_bind(c.source.clone())
                .push_bind(c.timezone.clone())
                .push_bind(c.tags.clone())
                .push_bind(c.custom_fields.clone())
                .push_bind(c.attribution.clone())
                .push_bind(c.date_added)
                .push_bind(c.local_date)
                .push_bind(c.local_week)
                .push_bind(c.local_month);
        });

        qb.push(
            " on conflict (account_id, external_id) do update set
               name = excluded.name,
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               email = excluded.email,
               phone = excluded.phone,
               source = excluded.source,
               timezone = excluded.timezone,
               tags = excluded.tags,
               custom_fields = excluded.custom_fields,
               attribution = excluded.attribution,
               date_added = excluded.date_added,
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

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn get_by_external_id(
        &self,
        account_id: Uuid,
        external_id: &str,
    ) -> SalesOpsResult<Option<ContactRow>> {
        let row = sqlx::query(&format!(
            "select {CONTACT_COLUMNS} from contacts where account_id = $1 and external_id = $2"
        ))
        .bind(account_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(row.map(Self::map_row))
    }
}
