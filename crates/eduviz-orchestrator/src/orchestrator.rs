//! `GenerateVideo` (spec §4.7): per-job fan-out over sections with bounded
//! concurrency, aggregation, final concatenation, and cleanup.

use std::path::PathBuf;
use std::sync::Arc;

use eduviz_core::{CleanupMode, JobStore, ProgressCallback, ProgressTracker};
use eduviz_gateway::Gateway;
use eduviz_models::{CostSummary, Script, ScriptMode, SourceMaterial};
use eduviz_script::PipelineInputs;
use eduviz_section::{SectionConfig, SectionError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Default semaphore capacity for the generic orchestrator entry point.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;
/// Default semaphore capacity for the main educational-video path.
pub const MAIN_PATH_MAX_CONCURRENT: usize = 3;

pub struct GenerateVideoRequest {
    pub job_id: String,
    pub material: SourceMaterial,
    pub voice: Option<String>,
    pub style: String,
    pub mode: ScriptMode,
    pub resume: bool,
    pub max_concurrent: usize,
    pub progress_cb: Option<ProgressCallback>,
    pub overview_prompt: String,
    pub outline_prompt: String,
}

impl GenerateVideoRequest {
    pub fn new(job_id: impl Into<String>, material: SourceMaterial, style: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            material,
            voice: None,
            style: style.into(),
            mode: ScriptMode::Comprehensive,
            resume: true,
            max_concurrent: MAIN_PATH_MAX_CONCURRENT,
            progress_cb: None,
            overview_prompt: String::new(),
            outline_prompt: String::new(),
        }
    }
}

/// One entry in the chapter timeline built from cumulative duration over
/// the sections that made it into the final video (spec §4.7 step 6).
#[derive(Debug, Clone)]
pub struct Chapter {
    pub section_id: String,
    pub title: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone)]
pub struct GenerateVideoResult {
    pub job_id: String,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed {
        video_path: PathBuf,
        script: Script,
        chapters: Vec<Chapter>,
        total_duration: f64,
        cost_summary: CostSummary,
    },
    Failed {
        error: String,
    },
}

struct SectionOutcome {
    index: usize,
    cached: bool,
    error: Option<SectionError>,
    video_path: Option<PathBuf>,
    audio_path: Option<PathBuf>,
    animation_source_path: Option<String>,
    duration: Option<f64>,
}

pub async fn generate_video(
    gateway: Arc<Gateway>,
    store: &JobStore,
    request: GenerateVideoRequest,
) -> OrchestratorResult<GenerateVideoResult> {
    let job_id = request.job_id.clone();
    let layout = store.open_job(&job_id).await?;

    // Step 1: inspect progress; short-circuit on a cached final video.
    let state = store.inspect(&job_id).await?;
    if state.has_final_video {
        if let Some(script) = state.script {
            info!(job_id, "final video already present, returning cached result");
            let cost_summary = gateway.cost_store().summary_for_job(&job_id).await;
            let chapters = build_chapters(&script);
            let total_duration = script.total_duration_estimate;
            return Ok(GenerateVideoResult {
                job_id,
                outcome: JobOutcome::Completed {
                    video_path: layout.final_video_path(),
                    script,
                    chapters,
                    total_duration,
                    cost_summary,
                },
            });
        }
    }

    let tracker = Arc::new(ProgressTracker::new(request.progress_cb.clone()));
    tracker.seed_completed(state.completed_sections.iter().copied()).await;

    // Step 2: load or run the Script Pipeline. `eduviz_script::pipeline::run`
    // already checks `script.json` first, so this single call covers both
    // the resume and fresh-generation branches.
    let bytes = read_material_bytes(&request.material).await?;
    let ingest_text = match &request.material {
        SourceMaterial::Text { content } => content.clone(),
        _ => String::new(),
    };
    let script = eduviz_script::run(
        gateway.as_ref(),
        store,
        &layout,
        &job_id,
        PipelineInputs {
            material: &request.material,
            bytes: bytes.as_deref(),
            source_text: &ingest_text,
            mode: request.mode,
            overview_prompt: &request.overview_prompt,
            outline_prompt: &request.outline_prompt,
        },
    )
    .await?;
    tracker.report_stage_progress("script", 10, "script ready");

    // Steps 3-5: bounded fan-out over sections.
    let semaphore = Arc::new(Semaphore::new(request.max_concurrent.max(1)));
    let total = script.section_count();
    let config = Arc::new(SectionConfig::new(request.style.clone(), script.language.clone(), request.voice.clone()));

    let mut joinset: JoinSet<SectionOutcome> = JoinSet::new();
    for (index, section) in script.sections.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let gateway_client = Arc::clone(&gateway);
        let store = store.clone();
        let layout = layout.clone();
        let tracker = Arc::clone(&tracker);
        let config = Arc::clone(&config);
        let job_id = job_id.clone();
        let resume = request.resume;
        let already_complete = resume && tracker.is_section_complete(index).await;

        joinset.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");

            let final_path = layout.final_section_path(index);
            if already_complete && final_path.exists() {
                tracker.mark_section_complete(index).await;
                tracker.report_section_progress(tracker.completed_count().await, total, true);
                return SectionOutcome {
                    index,
                    cached: true,
                    error: None,
                    video_path: Some(final_path),
                    audio_path: Some(layout.section_audio_path(index)),
                    animation_source_path: Some(layout.scene_source_path(index).to_string_lossy().to_string()),
                    duration: None,
                };
            }

            let result = eduviz_section::process_section(gateway_client.as_ref(), &job_id, &store, &layout, index, &section, &config).await;
            match result {
                Ok(processed) => {
                    tracker.mark_section_complete(index).await;
                    tracker.report_section_progress(tracker.completed_count().await, total, false);
                    SectionOutcome {
                        index,
                        cached: false,
                        error: None,
                        video_path: processed.artifacts.video_path.map(PathBuf::from),
                        audio_path: processed.artifacts.audio_path.map(PathBuf::from),
                        animation_source_path: processed.artifacts.animation_source_path,
                        duration: processed.artifacts.duration,
                    }
                }
                Err(e) => {
                    warn!(index, error = %e, "section failed, continuing with siblings");
                    tracker.mark_section_failed(index).await;
                    SectionOutcome {
                        index,
                        cached: false,
                        error: Some(e),
                        video_path: None,
                        audio_path: None,
                        animation_source_path: None,
                        duration: None,
                    }
                }
            }
        });
    }

    // Step 5: gather. A panicking task is treated the same as a returned
    // error — it never cancels its siblings.
    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = joinset.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!("section task panicked: {}", e),
        }
    }
    outcomes.sort_by_key(|o| o.index);

    // Step 6: aggregate. A section contributes only if both artifacts
    // exist; video-only is tolerated (silent audio), audio-only is dropped.
    let mut script = script;
    let mut included: Vec<(usize, PathBuf)> = Vec::new();
    let mut cumulative = 0.0f64;
    let mut chapters = Vec::new();

    for outcome in &outcomes {
        debug!(index = outcome.index, cached = outcome.cached, "aggregating section outcome");
        let Some(section) = script.sections.get_mut(outcome.index) else { continue };
        if let Some(duration) = outcome.duration {
            section.artifacts.duration = Some(duration);
        }
        section.artifacts.video_path = outcome.video_path.as_ref().map(|p| p.to_string_lossy().to_string());
        section.artifacts.audio_path = outcome.audio_path.as_ref().map(|p| p.to_string_lossy().to_string());
        if let Some(src) = &outcome.animation_source_path {
            section.artifacts.animation_source_path = Some(src.clone());
        }

        if section.artifacts.video_path.is_none() {
            continue; // audio-only contributes nothing visual
        }

        let duration = section.artifacts.duration.unwrap_or(0.0);
        chapters.push(Chapter {
            section_id: section.id.clone(),
            title: section.title.clone(),
            start_time: cumulative,
            end_time: cumulative + duration,
        });
        cumulative += duration;

        if let Some(video_path) = &outcome.video_path {
            included.push((outcome.index, video_path.clone()));
        }
    }

    store.write_script(&layout, &script).await?;

    if included.is_empty() {
        let first_error = outcomes.iter().find_map(|o| o.error.as_ref().map(|e| e.to_string()));
        let error = first_error.unwrap_or_else(|| "no section produced a usable video".to_string());
        return Ok(GenerateVideoResult { job_id, outcome: JobOutcome::Failed { error } });
    }

    // Step 7: concatenate. `included` is already in section order because
    // `outcomes` was sorted by index above.
    let video_paths: Vec<PathBuf> = included.into_iter().map(|(_, p)| p).collect();
    let final_path = layout.final_video_path();
    eduviz_media::concat_videos(&video_paths, &final_path).await?;

    let info = eduviz_media::probe_video(&final_path).await.ok();
    let total_duration = info.map(|i| i.duration).unwrap_or(cumulative);

    if !final_path.exists() || tokio::fs::metadata(&final_path).await.map(|m| m.len()).unwrap_or(0) == 0 {
        return Err(OrchestratorError::EmptyResult);
    }

    // Step 8: cleanup, keeping only the final artifacts.
    if let Err(e) = store.cleanup(&job_id, CleanupMode::KeepFinalOnly).await {
        warn!(job_id, error = %e, "post-completion cleanup failed, final video is unaffected");
    }

    // Step 9: cost summary.
    let cost_summary = gateway.cost_store().summary_for_job(&job_id).await;
    tracker.report_stage_progress("complete", 100, "video ready");

    Ok(GenerateVideoResult {
        job_id,
        outcome: JobOutcome::Completed {
            video_path: final_path,
            script,
            chapters,
            total_duration,
            cost_summary,
        },
    })
}

fn build_chapters(script: &Script) -> Vec<Chapter> {
    let mut cumulative = 0.0;
    script
        .sections
        .iter()
        .filter(|s| s.artifacts.video_path.is_some())
        .map(|s| {
            let duration = s.artifacts.duration.unwrap_or(0.0);
            let chapter = Chapter {
                section_id: s.id.clone(),
                title: s.title.clone(),
                start_time: cumulative,
                end_time: cumulative + duration,
            };
            cumulative += duration;
            chapter
        })
        .collect()
}

async fn read_material_bytes(material: &SourceMaterial) -> OrchestratorResult<Option<Vec<u8>>> {
    match material {
        SourceMaterial::Pdf { path } | SourceMaterial::Image { path, .. } => Ok(Some(tokio::fs::read(path).await?)),
        SourceMaterial::Text { .. } => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduviz_models::{NarrationSegment, PageRange, Script, ScriptMode, Section, SectionArtifacts, SupportingDataItem};

    fn section_with_video(id: &str, title: &str, duration: Option<f64>) -> Section {
        Section {
            id: id.to_string(),
            title: title.to_string(),
            narration: String::new(),
            tts_narration: String::new(),
            segments: Vec::<NarrationSegment>::new(),
            supporting_data: Vec::<SupportingDataItem>::new(),
            source_page_range: None::<PageRange>,
            artifacts: SectionArtifacts {
                video_path: Some(format!("/tmp/{id}.mp4")),
                audio_path: Some(format!("/tmp/{id}.mp3")),
                animation_source_path: None,
                duration,
            },
        }
    }

    fn empty_script(sections: Vec<Section>) -> Script {
        Script {
            title: "t".into(),
            subject_area: "s".into(),
            overview: "o".into(),
            learning_objectives: Vec::new(),
            sections,
            total_duration_estimate: 0.0,
            mode: ScriptMode::Comprehensive,
            language: "en".into(),
        }
    }

    #[test]
    fn chapters_accumulate_by_duration_and_skip_abandoned_sections() {
        let mut abandoned = section_with_video("c", "Abandoned", None);
        abandoned.artifacts.video_path = None;

        let script = empty_script(vec![
            section_with_video("a", "Intro", Some(10.0)),
            abandoned,
            section_with_video("b", "Body", Some(20.0)),
        ]);

        let chapters = build_chapters(&script);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].section_id, "a");
        assert_eq!(chapters[0].start_time, 0.0);
        assert_eq!(chapters[0].end_time, 10.0);
        assert_eq!(chapters[1].section_id, "b");
        assert_eq!(chapters[1].start_time, 10.0);
        assert_eq!(chapters[1].end_time, 30.0);
    }
}
