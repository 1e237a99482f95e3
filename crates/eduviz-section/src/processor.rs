//! Per-section procedure (spec §4.6): TTS -> animate -> render -> merge.
//! Runs inside C7's bounded worker pool; a single call owns the section
//! directory for its whole lifetime.

use std::path::PathBuf;
use std::sync::Arc;

use eduviz_animation::{SpatialWhitelist, MAX_CORRECTION_ATTEMPTS};
use eduviz_core::{JobLayout, JobStore};
use eduviz_gateway::Gateway;
use eduviz_media::{RendererConfig, TtsConfig};
use eduviz_models::{Section, SectionArtifacts, SectionStatus};
use tracing::{info, warn};

use crate::error::{SectionError, SectionResult};

#[derive(Debug, Clone)]
pub struct SectionConfig {
    pub style: String,
    pub language: String,
    pub voice: Option<String>,
    pub renderer: RendererConfig,
    pub tts: TtsConfig,
    /// Shared across every section of one job, so a spatial issue
    /// recurring on the same section is recognized and suppressed for the
    /// remainder of the job rather than reset per call.
    pub whitelist: Arc<SpatialWhitelist>,
}

impl SectionConfig {
    pub fn new(style: impl Into<String>, language: impl Into<String>, voice: Option<String>) -> Self {
        Self {
            style: style.into(),
            language: language.into(),
            voice,
            renderer: RendererConfig::default(),
            tts: TtsConfig::default(),
            whitelist: Arc::new(SpatialWhitelist::new()),
        }
    }
}

pub struct ProcessedSection {
    pub index: usize,
    pub artifacts: SectionArtifacts,
}

/// Runs the full per-section procedure and writes its realized artifacts.
/// Never cancels or affects sibling sections — all failures are returned
/// as `Err`, which the caller (C7) converts into a captured
/// `SectionResult{error}` without propagating (spec §7 "Section failures
/// never cancel sibling sections").
pub async fn process_section(
    gateway: &Gateway,
    job_id: &str,
    store: &JobStore,
    layout: &JobLayout,
    index: usize,
    section: &Section,
    config: &SectionConfig,
) -> SectionResult<ProcessedSection> {
    let section_dir = layout.section_dir(index);
    tokio::fs::create_dir_all(&section_dir).await?;

    store.write_status(&section_dir, SectionStatus::GeneratingAudio, None).await?;
    let (audio_path, measured_duration) = synthesize_audio(config, section, layout, index).await?;

    store.write_status(&section_dir, SectionStatus::GeneratingAnimation, None).await?;
    let scene_path = layout.scene_source_path(index);
    let outcome = eduviz_animation::produce_animation(
        gateway,
        job_id,
        section,
        measured_duration,
        &config.style,
        &config.language,
        eduviz_animation::BASE_TEMPERATURE,
        &scene_path,
        config.whitelist.as_ref(),
    )
    .await?;
    tokio::fs::write(&scene_path, &outcome.source).await?;
    let mut class_name = outcome.class_name;

    let media_dir = layout.section_media_dir(index);
    let scene_stem = format!("scene_{index}");
    let video_path = render_with_corrections(
        gateway,
        job_id,
        &section.id,
        store,
        &section_dir,
        &scene_path,
        &mut class_name,
        &media_dir,
        &scene_stem,
        index,
        config,
    )
    .await?;

    let final_path = layout.final_section_path(index);
    let merged = eduviz_media::merge_no_cut(&video_path, &audio_path, &final_path).await.map_err(SectionError::Media)?;

    store.write_status(&section_dir, SectionStatus::Completed, None).await?;
    info!(index, duration = merged.duration, "section completed");

    Ok(ProcessedSection {
        index,
        artifacts: SectionArtifacts {
            video_path: Some(final_path.to_string_lossy().to_string()),
            audio_path: Some(audio_path.to_string_lossy().to_string()),
            animation_source_path: Some(scene_path.to_string_lossy().to_string()),
            duration: Some(merged.duration),
        },
    })
}

/// Step 2 (spec §4.6): TTS every Narration Segment in order, concatenate
/// losslessly, probe the real duration, and write the single-segment
/// alias file the on-disk layout documents.
async fn synthesize_audio(
    config: &SectionConfig,
    section: &Section,
    layout: &JobLayout,
    index: usize,
) -> SectionResult<(PathBuf, f64)> {
    let section_dir = layout.section_dir(index);
    let segment_paths =
        eduviz_media::synthesize_segments(&config.tts, &section.segments, config.voice.as_deref(), &section_dir)
            .await
            .map_err(SectionError::Media)?;

    let audio_path = layout.section_audio_path(index);
    let duration = eduviz_media::concat_segment_audio(&segment_paths, &audio_path).await.map_err(SectionError::Media)?;

    if section.segments.len() <= 1 {
        let alias = layout.section_alias_audio_path(index);
        tokio::fs::copy(&audio_path, &alias).await?;
    }

    Ok((audio_path, duration))
}

/// Steps 4-5 (spec §4.6): render, and on failure correct through C5 up to
/// `MAX_CORRECTION_ATTEMPTS` times before abandoning the section. The
/// partial-movie-fragment directory and any stale output are wiped before
/// every attempt.
#[allow(clippy::too_many_arguments)]
async fn render_with_corrections(
    gateway: &Gateway,
    job_id: &str,
    section_id: &str,
    store: &JobStore,
    section_dir: &std::path::Path,
    scene_path: &std::path::Path,
    class_name: &mut String,
    media_dir: &std::path::Path,
    scene_stem: &str,
    index: usize,
    config: &SectionConfig,
) -> SectionResult<PathBuf> {
    let mut last_err: Option<String> = None;

    for attempt in 0..=MAX_CORRECTION_ATTEMPTS {
        eduviz_media::clean_scene_media(media_dir, scene_stem).await.map_err(SectionError::Media)?;

        match eduviz_media::render_scene(&config.renderer, scene_path, class_name, media_dir, index).await {
            Ok(outcome) => return Ok(outcome.video_path),
            Err(e) => {
                warn!(index, attempt, error = %e, "render attempt failed");
                let stderr_tail = tail(&e.to_string(), 1500);
                last_err = Some(stderr_tail.clone());

                if attempt == MAX_CORRECTION_ATTEMPTS {
                    break;
                }

                store.write_status(section_dir, SectionStatus::FixingError, Some(&stderr_tail)).await?;
                let corrected = eduviz_animation::correct_after_render_failure(
                    gateway,
                    job_id,
                    section_id,
                    class_name,
                    &stderr_tail,
                    scene_path,
                    config.whitelist.as_ref(),
                )
                .await?;
                tokio::fs::write(scene_path, &corrected.source).await?;
                *class_name = corrected.class_name;
            }
        }
    }

    Err(SectionError::Abandoned {
        index,
        attempts: MAX_CORRECTION_ATTEMPTS,
        reason: last_err.unwrap_or_else(|| "renderer failed with no captured output".to_string()),
    })
}

fn tail(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let skip = s.chars().count() - max_chars;
        s.chars().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_truncates_from_the_front() {
        let long = "a".repeat(2000) + "END";
        let t = tail(&long, 1500);
        assert_eq!(t.len(), 1500);
        assert!(t.ends_with("END"));
    }

    #[test]
    fn tail_passes_through_short_strings() {
        assert_eq!(tail("short", 1500), "short");
    }
}
