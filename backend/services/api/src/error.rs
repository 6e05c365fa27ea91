use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use salesops_common::error::SalesOpsError;
use salesops_sync::SyncError;

pub struct ApiError(pub SalesOpsError);

impl From<SalesOpsError> for ApiError {
    fn from(err: SalesOpsError) -> Self {
        Self(err)
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            SalesOpsError::Validation(msg) => (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg })),
            SalesOpsError::Auth(msg) => (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg })),
            SalesOpsError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            SalesOpsError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
            SalesOpsError::Upstream { status, body } => {
                tracing::warn!(upstream_status = status, "upstream provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    serde_json::json!({
                        "error": "upstream provider error",
                        "upstreamStatus": status,
                        "body": body,
                    }),
                )
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
