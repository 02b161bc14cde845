use reqwest::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced to callers of the progress and completion operations.
///
/// Data-integrity problems (completed lessons missing from the course,
/// completed count above total) are not errors: they are logged and the
/// affected values are clamped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Content store failure: {0}")]
    Upstream(String),
}

impl CoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CoreError::NotFound(what),
            other => CoreError::Upstream(other.to_string()),
        }
    }
}
