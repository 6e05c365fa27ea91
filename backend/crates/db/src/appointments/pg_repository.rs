use async_trait::async_trait;
use salesops_common::error::{SalesOpsError, SalesOpsResult};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::appointments::models::AppointmentRow;
use crate::appointments::repositories::AppointmentRepository;
use crate::upsert::BatchUpsert;

const APPOINTMENT_COLUMNS: &str = "id, account_id, external_id, calendar_id, contact_external_id, \
     contact_id, title, status, assigned_user_id, start_time, end_time, local_date, local_week, \
     local_month, enrichments";

#[derive(Clone)]
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchUpsert<AppointmentRow> for PgAppointmentRepository {
    async fn upsert_batch(&self, rows: &[AppointmentRow]) -> SalesOpsResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("insert into appointments ({APPOINTMENT_COLUMNS}) "));

        qb.push_values(rows, |mut b, a| {
            b.push_bind(a.id)
                .push_bind(a.account_id)
                .push_bind(a.external_id.clone())
                .push_bind(a.calendar_id.clone())
                .push_bind(a.contact_external_id.clone())
                .push_bind(a.contact_id)
                .push_bind(a.title.clone())
                .push_bind(a.status.clone())
                .push_bind(a.assigned_user_id.clone())
                .push_bind(a.start_time)
                .push_bind(a.end_time)
                .push_bind(a.local_date)
                .push_bind(a.local_week)
                .push_bind(a.local_month)
                .push_bind(Json(a.enrichments.clone()));
        });

        qb.push(
            " on conflict (account_id, external_id) do update set
               calendar_id = excluded.calendar_id,
               contact_external_id = excluded.contact_external_id,
               contact_id = excluded.contact_id,
               title = excluded.title,
               status = excluded.status,
               assigned_user_id = excluded.assigned_user_id,
               start_time = excluded.start_time,
               end_time = excluded.end_time,
               local_date = excluded.local_date,
               local_week = excluded.local_week,
               local_month = excluded.local_month,
               enrichments = excluded.enrichments,
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

impl AppointmentRepository for PgAppointmentRepository {}
