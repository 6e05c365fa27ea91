use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use salesops_sync::contacts::ContactSyncSummary;
use salesops_sync::progress::{NoProgress, ProgressEvent};
use tokio::sync::mpsc;

use crate::contacts::requests::SyncContactsRequest;
use crate::error::ApiError;
use crate::AppState;

pub async fn sync_contacts(
    State(state): State<AppState>,
    Json(req): Json<SyncContactsRequest>,
) -> Result<Json<ContactSyncSummary>, ApiError> {
    let options = req.options()?;
    let session = state.ghl_session(req.account_id).await?;

    let summary = state
        .contact_syncer()
        .sync(&session, &options, &NoProgress)
        .await?;
    Ok(Json(summary))
}

/// Same sync, reported as server-sent events. Errors found before the walk
/// starts (bad request, unknown account) are returned as plain JSON errors.
pub async fn sync_contacts_stream(
    State(state): State<AppState>,
    Json(req): Json<SyncContactsRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let options = req.options()?;
    let session = state.ghl_session(req.account_id).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let syncer = state.contact_syncer();
    let account_id = req.account_id;
    tokio::spawn(async move {
        if let Err(e) = syncer.sync(&session, &options, &tx).await {
            tracing::warn!(%account_id, error = %e, "streamed contact sync ended with error");
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.stage.is_terminal();
            yield Ok(sse_event(&event));
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn sse_event(event: &ProgressEvent) -> Event {
    Event::default()
        .event(event.stage.event_name())
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
