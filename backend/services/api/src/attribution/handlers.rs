use axum::extract::State;
use axum::Json;
use salesops_attribution::match_session;

use crate::attribution::requests::MatchAttributionRequest;
use crate::attribution::responses::MatchAttributionResponse;
use crate::error::ApiError;
use crate::AppState;

pub async fn match_attribution(
    State(state): State<AppState>,
    Json(req): Json<MatchAttributionRequest>,
) -> Result<Json<MatchAttributionResponse>, ApiError> {
    let result = match_session(
        &state.attribution,
        req.account_id,
        &req.signals(),
        &state.attribution_config,
    )
    .await?;

    tracing::info!(
        account_id = %req.account_id,
        matched = result.session.is_some(),
        strategy = result.trace.matched.map(|s| s.as_str()),
        "attribution match"
    );
    Ok(Json(result.into()))
}
