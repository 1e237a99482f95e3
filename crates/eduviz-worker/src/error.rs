//! Engine-level error type, wrapping every component's error for the
//! `ExecuteJob` ingress boundary (spec §6, §7).

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("orchestrator failed: {0}")]
    Orchestrator(#[from] eduviz_orchestrator::OrchestratorError),

    #[error("job store failed: {0}")]
    Store(#[from] eduviz_core::StoreError),

    #[error("gateway failed: {0}")]
    Gateway(#[from] eduviz_gateway::GatewayError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
