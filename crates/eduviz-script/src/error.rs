//! Script Pipeline (C4) error types.

use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("gateway call failed: {0}")]
    Gateway(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("unsupported source material")]
    UnsupportedMaterial,

    #[error("script violates constraints after retries: {0}")]
    ConstraintViolation(String),

    #[error("outline generation failed after {0} attempts")]
    OutlineExhausted(u32),

    #[error("store error: {0}")]
    Store(#[from] eduviz_core::StoreError),
}

impl ScriptError {
    pub fn from_gateway_result(context: &str, error: Option<String>) -> Self {
        ScriptError::Gateway(format!("{context}: {}", error.unwrap_or_else(|| "unknown error".into())))
    }
}
