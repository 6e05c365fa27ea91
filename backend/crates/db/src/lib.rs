pub mod accounts;
pub mod appointments;
pub mod attribution;
pub mod contacts;
pub mod dials;
pub mod sync;
pub mod upsert;

use salesops_common::error::{SalesOpsError, SalesOpsResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> SalesOpsResult<PgPool> {
    tracing::info!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))
}
