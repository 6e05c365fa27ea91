pub mod handlers;
pub mod requests;

use axum::routing::post;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync-contacts", post(handlers::sync_contacts))
        .route("/sync-contacts/stream", post(handlers::sync_contacts_stream))
}
