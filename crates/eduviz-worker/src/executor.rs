//! The engine: wires the Job Store, Gateway, and Section Orchestrator
//! behind the `ExecuteJob(request) -> result` ingress interface (spec §6).

use std::sync::Arc;

use eduviz_core::{CleanupConfig, CostStore, JobStore, ProgressCallback};
use eduviz_gateway::{Gateway, ProviderClient};
use eduviz_models::{ScriptMode, SourceMaterial};
use eduviz_orchestrator::{GenerateVideoRequest, GenerateVideoResult, TranslateJobRequest, TranslateJobResult};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::WorkerResult;

/// Request fields for `ExecuteJob`, mirroring spec §4.7's `GenerateVideo`
/// inputs exactly (job_id, material, voice, style, mode, resume, an
/// optional progress callback).
pub struct ExecuteJobRequest {
    pub job_id: String,
    pub material: SourceMaterial,
    pub voice: Option<String>,
    pub style: String,
    pub mode: ScriptMode,
    pub resume: bool,
    pub progress_callback: Option<ProgressCallback>,
    pub overview_prompt: String,
    pub outline_prompt: String,
}

pub type ExecuteJobResult = GenerateVideoResult;

/// The engine, owning the one `Gateway` and `JobStore` shared by every job
/// it executes (spec §3 Ownership: a job is mutated only by the single
/// orchestrator coroutine handling it; the engine is just the entry point
/// that hands each request to that coroutine).
pub struct Engine {
    config: EngineConfig,
    gateway: Arc<Gateway>,
    store: JobStore,
    cleanup_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Engine {
    /// Build the engine from a loaded config, constructing the provider
    /// client from `GEMINI_API_KEY` (spec §6 external collaborator (a)).
    pub fn new(config: EngineConfig) -> WorkerResult<Self> {
        let provider = ProviderClient::from_env()?;
        let cost_store = CostStore::new();
        let gateway = Gateway::new(provider, cost_store, config.model.clone());
        let store = JobStore::new(config.job_root.clone());

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
            store,
            cleanup_handle: None,
        })
    }

    /// Start the periodic cleanup scheduler (spec §4.1, §9 supplement).
    /// Idempotent in spirit: callers start this once at process startup.
    pub fn start_cleanup_scheduler(&mut self) {
        if !self.config.cleanup.enabled {
            info!("cleanup scheduler disabled via OUTPUT_CLEANUP_ENABLED=false");
            return;
        }
        let store = self.store.clone();
        let cleanup: CleanupConfig = self.config.cleanup.clone();
        info!(interval_secs = cleanup.interval.as_secs(), "starting cleanup scheduler");
        self.cleanup_handle = Some(eduviz_core::spawn_cleanup_scheduler(store, cleanup));
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }

    /// The ingress entry point itself: runs the full pipeline for one job,
    /// or resumes it, and returns once the job reaches a terminal state.
    pub async fn execute_job(&self, request: ExecuteJobRequest) -> WorkerResult<ExecuteJobResult> {
        let max_concurrent = if request.mode == ScriptMode::Overview {
            self.config.main_path_max_concurrent
        } else {
            self.config.max_concurrent_sections
        };

        let generate_request = GenerateVideoRequest {
            job_id: request.job_id,
            material: request.material,
            voice: request.voice,
            style: request.style,
            mode: request.mode,
            resume: request.resume,
            max_concurrent,
            progress_cb: request.progress_callback,
            overview_prompt: request.overview_prompt,
            outline_prompt: request.outline_prompt,
        };

        let result = eduviz_orchestrator::generate_video(Arc::clone(&self.gateway), &self.store, generate_request).await?;
        Ok(result)
    }

    /// The supplemented `TranslateJob` feature: re-narrate a completed job
    /// in another language without re-rendering its animation.
    pub async fn translate_job(&self, request: TranslateJobRequest) -> WorkerResult<TranslateJobResult> {
        let result = eduviz_orchestrator::translate_job(self.gateway.as_ref(), &self.store, request).await?;
        Ok(result)
    }
}
