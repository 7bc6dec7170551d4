use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by the schedule engine, the budget aggregator and
/// the CRUD surface. CRUD methods let all three variants propagate; the sweep
/// catches per-item errors itself (see `schedule::service`).
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Invariant violation in user-supplied data. Carries every violation
    /// found, not just the first.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Entity absent, or present but not owned by the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Store call failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Persistence(e.to_string())
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            LedgerError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "details": errors }),
            ),
            LedgerError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            LedgerError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal error" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
