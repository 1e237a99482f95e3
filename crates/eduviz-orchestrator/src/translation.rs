//! `TranslateJob(job_id, target_lang)`: a supplemented feature, not part of
//! the main `GenerateVideo` flow. Re-synthesizes a completed job's
//! narration in another language and re-merges it against the *existing*
//! rendered video via C6's no-cut merge — the animation itself is never
//! re-rendered. Reuses Stage D segmentation and one Gateway call per
//! section for the translated narration.

use std::path::PathBuf;

use eduviz_core::JobStore;
use eduviz_gateway::{Gateway, GenerateConfig, GenerateOpts, ResponseFormat};
use eduviz_media::TtsConfig;
use eduviz_script::segment_narration;
use tracing::{info, warn};

use crate::error::{OrchestratorError, OrchestratorResult};

const TRANSLATE_PROMPT_TEMPLATE: &str = "Translate the following narration into {lang} for a spoken video \
voiceover. Preserve [PAUSE] markers exactly where they occur. Respond with only the translated text.";

pub struct TranslateJobRequest {
    pub job_id: String,
    pub target_lang: String,
    pub voice: Option<String>,
}

pub struct TranslateJobResult {
    pub job_id: String,
    pub target_lang: String,
    pub video_path: PathBuf,
}

/// Requires a completed job (`final_video.mp4` present) and a persisted
/// script with realized per-section video artifacts. Per-section output
/// videos are reused as-is; only audio is regenerated.
pub async fn translate_job(
    gateway: &Gateway,
    store: &JobStore,
    request: TranslateJobRequest,
) -> OrchestratorResult<TranslateJobResult> {
    let layout = store.open_job(&request.job_id).await?;
    let script = store
        .read_script(&layout)
        .await?
        .ok_or_else(|| OrchestratorError::EmptyResult)?;

    let tts = TtsConfig::default();
    let mut section_videos = Vec::with_capacity(script.sections.len());

    for (index, section) in script.sections.iter().enumerate() {
        let Some(video_path) = section.artifacts.video_path.as_ref() else {
            continue; // abandoned section: no video to carry into the translation
        };

        let translated = translate_narration(gateway, &request.job_id, &section.narration, &request.target_lang).await?;
        let segments = segment_narration(&translated);

        let section_dir = layout
            .translations_dir()
            .join(&request.target_lang)
            .join("sections")
            .join(index.to_string());
        tokio::fs::create_dir_all(&section_dir).await?;

        let segment_paths = eduviz_media::synthesize_segments(&tts, &segments, request.voice.as_deref(), &section_dir)
            .await
            .map_err(OrchestratorError::Media)?;
        let audio_path = section_dir.join("section_audio.mp3");
        eduviz_media::concat_segment_audio(&segment_paths, &audio_path).await.map_err(OrchestratorError::Media)?;

        let merged_path = section_dir.join("final_section.mp4");
        eduviz_media::merge_no_cut(&PathBuf::from(video_path), &audio_path, &merged_path)
            .await
            .map_err(OrchestratorError::Media)?;

        section_videos.push(merged_path);
    }

    if section_videos.is_empty() {
        return Err(OrchestratorError::EmptyResult);
    }

    let out_path = layout.translation_video_path(&request.target_lang)?;
    eduviz_media::concat_videos(&section_videos, &out_path).await?;
    info!(job_id = request.job_id, lang = request.target_lang, "translation complete");

    Ok(TranslateJobResult {
        job_id: request.job_id,
        target_lang: request.target_lang,
        video_path: out_path,
    })
}

async fn translate_narration(gateway: &Gateway, job_id: &str, narration: &str, target_lang: &str) -> OrchestratorResult<String> {
    let prompt = format!("{} \n\n{}", TRANSLATE_PROMPT_TEMPLATE.replace("{lang}", target_lang), narration);
    let config = GenerateConfig {
        response_format: ResponseFormat::Text,
        ..Default::default()
    };
    let result = gateway.generate(job_id, &prompt, &config, &GenerateOpts::default()).await;
    if !result.success || result.response.trim().is_empty() {
        warn!(job_id, target_lang, "translation call failed, falling back to source narration");
        return Ok(narration.to_string());
    }
    Ok(result.response)
}
