use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalesOpsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Non-OK response from a third-party provider, carried through verbatim.
    #[error("upstream HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SalesOpsResult<T> = Result<T, SalesOpsError>;
