//! Animation Agent (C5) error types.

use thiserror::Error;

pub type AnimationResult<T> = Result<T, AnimationError>;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("gateway call failed: {0}")]
    Gateway(String),

    #[error("choreographer exhausted all fallback paths: {0}")]
    Choreography(String),

    #[error("refiner exhausted {0} attempts and the full-rewrite fallback")]
    Refinement(u32),

    #[error("preflight helper failed: {0}")]
    Preflight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("section abandoned after exhausting clean-retry budget")]
    Abandoned,
}
