use reqwest::StatusCode;
use salesops_common::error::SalesOpsError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("sync already running: {0}")]
    AlreadyRunning(String),

    #[error("sync cancelled by client")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] SalesOpsError),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl From<SyncError> for SalesOpsError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Http { status, body } => SalesOpsError::Upstream {
                status: status.as_u16(),
                body,
            },
            SyncError::Request(e) => SalesOpsError::Upstream {
                status: e
                    .status()
                    .map(|s| s.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY.as_u16()),
                body: e.to_string(),
            },
            SyncError::Decode(msg) => SalesOpsError::Internal(format!("decode: {msg}")),
            SyncError::Auth(msg) => SalesOpsError::Auth(msg),
            SyncError::AlreadyRunning(msg) => SalesOpsError::Conflict(msg),
            SyncError::Cancelled => SalesOpsError::Internal("sync cancelled".to_string()),
            SyncError::Storage(e) => e,
        }
    }
}
