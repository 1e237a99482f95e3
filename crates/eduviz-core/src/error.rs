//! Job Store / Progress Tracker error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("job directory not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// `InvalidId` is always fatal to the caller (spec §7) — never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::InvalidId(_))
    }
}

impl From<eduviz_models::InvalidId> for StoreError {
    fn from(e: eduviz_models::InvalidId) -> Self {
        StoreError::InvalidId(e.0)
    }
}
