//! Engine configuration.

use std::time::Duration;

use eduviz_core::CleanupConfig;
use eduviz_media::{RendererConfig, TtsConfig};

/// Top-level engine configuration, gathering the Job Store root, the
/// Gateway's model name, and concurrency limits. `RendererConfig`,
/// `TtsConfig`, and `CleanupConfig` each already load their own
/// `MANIM_*`/`TTS_*`/`OUTPUT_*` env vars (spec §6), so only the
/// engine-level knobs are duplicated here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory under which every job's directory tree lives.
    pub job_root: String,
    /// Model name passed to the Gateway, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Default bound on concurrent section workers for a job (spec §5).
    pub max_concurrent_sections: usize,
    /// Tighter bound used when a job runs on the interactive/main path.
    pub main_path_max_concurrent: usize,
    pub shutdown_timeout: Duration,
    pub renderer: RendererConfig,
    pub tts: TtsConfig,
    pub cleanup: CleanupConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            job_root: "/tmp/eduviz".to_string(),
            model: "gemini-2.5-flash".to_string(),
            max_concurrent_sections: eduviz_orchestrator::DEFAULT_MAX_CONCURRENT,
            main_path_max_concurrent: eduviz_orchestrator::MAIN_PATH_MAX_CONCURRENT,
            shutdown_timeout: Duration::from_secs(30),
            renderer: RendererConfig::default(),
            tts: TtsConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            job_root: std::env::var("EDUVIZ_JOB_ROOT").unwrap_or(default.job_root),
            model: std::env::var("GEMINI_MODEL").unwrap_or(default.model),
            max_concurrent_sections: std::env::var("EDUVIZ_MAX_CONCURRENT_SECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_concurrent_sections),
            main_path_max_concurrent: std::env::var("EDUVIZ_MAIN_PATH_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.main_path_max_concurrent),
            shutdown_timeout: Duration::from_secs(
                std::env::var("EDUVIZ_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            renderer: RendererConfig::default(),
            tts: TtsConfig::default(),
            cleanup: CleanupConfig::from_env(),
        }
    }
}
