use axum::extract::State;
use axum::Json;
use salesops_sync::appointments::AppointmentBackfillSummary;
use salesops_sync::calls::CallBackfillSummary;

use crate::backfill::requests::{BackfillAppointmentsRequest, BackfillCallsRequest};
use crate::error::ApiError;
use crate::AppState;

pub async fn backfill_appointments(
    State(state): State<AppState>,
    Json(req): Json<BackfillAppointmentsRequest>,
) -> Result<Json<AppointmentBackfillSummary>, ApiError> {
    let options = req.options()?;
    let session = state.ghl_session(req.account_id).await?;

    let summary = state
        .appointment_backfiller()
        .backfill(&session, &options)
        .await?;
    Ok(Json(summary))
}

pub async fn backfill_calls(
    State(state): State<AppState>,
    Json(req): Json<BackfillCallsRequest>,
) -> Result<Json<CallBackfillSummary>, ApiError> {
    let options = req.options()?;
    let session = state.ghl_session(req.account_id).await?;

    let summary = state.call_backfiller().backfill(&session, &options).await?;
    Ok(Json(summary))
}
