pub mod handlers;
pub mod requests;

use axum::routing::post;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/backfill-appointments", post(handlers::backfill_appointments))
        .route("/backfill-calls", post(handlers::backfill_calls))
}
