//! Section Orchestrator (C7) error types.

use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("script pipeline failed: {0}")]
    Script(#[from] eduviz_script::ScriptError),

    #[error("media adapter failed: {0}")]
    Media(#[from] eduviz_media::MediaError),

    #[error("job store failed: {0}")]
    Store(#[from] eduviz_core::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("final concatenation produced no playable video")]
    EmptyResult,
}
