//! LLM Gateway error types (spec §4.3, §7 `GatewayError`).

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("response rejected by schema: {0}")]
    SchemaRejected(String),

    #[error("gateway call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("provider returned an empty response")]
    Empty,

    #[error("provider returned HTTP {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("missing GEMINI_API_KEY (or configured provider key)")]
    MissingApiKey,

    #[error("function call loop exceeded MAX_ITERATIONS ({0})")]
    IterationCapExceeded(u32),

    #[error("unknown tool requested by model: {0}")]
    UnknownTool(String),
}

impl GatewayError {
    /// Retriable inside the gateway's own attempt loop (spec §4.3); never
    /// surfaced to the caller unless the final attempt also fails.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Request(_)
                | GatewayError::InvalidJson(_)
                | GatewayError::SchemaRejected(_)
                | GatewayError::Timeout(_)
                | GatewayError::Empty
                | GatewayError::ProviderStatus { .. }
        )
    }

    /// Maps to the `error_reason` field of a [`crate::gateway::GenerateResult`].
    pub fn reason_code(&self) -> &'static str {
        match self {
            GatewayError::InvalidJson(_) => "invalid_json",
            GatewayError::SchemaRejected(_) => "schema_rejected",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Empty => "empty",
            _ => "provider_error",
        }
    }
}
