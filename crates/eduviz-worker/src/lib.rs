//! Engine binary: wires the Job Store, Gateway, Script Pipeline, Animation
//! Agent, media adapters, and Section Orchestrator behind the
//! `ExecuteJob(request) -> result` ingress interface (spec §6).

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;

pub use config::EngineConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{Engine, ExecuteJobRequest, ExecuteJobResult};
pub use logging::JobLogger;
