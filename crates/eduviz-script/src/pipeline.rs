//! Wires Stages A-E together (spec §4.4): ingest, detect language,
//! dispatch by mode, segment, and persist exactly once.

use eduviz_core::{JobLayout, JobStore};
use eduviz_gateway::Gateway;
use eduviz_models::{Script, ScriptMode, SourceMaterial};
use tracing::info;

use crate::comprehensive;
use crate::error::ScriptResult;
use crate::ingestion::{self, Ingested};
use crate::language;
use crate::overview;

pub struct PipelineInputs<'a> {
    pub material: &'a SourceMaterial,
    pub bytes: Option<&'a [u8]>,
    pub source_text: &'a str,
    pub mode: ScriptMode,
    pub overview_prompt: &'a str,
    pub outline_prompt: &'a str,
}

/// Runs the full Script Pipeline for a job, or returns the already-persisted
/// script on resume (spec §4.4 Stage E).
pub async fn run(
    gateway: &Gateway,
    store: &JobStore,
    layout: &JobLayout,
    job_id: &str,
    inputs: PipelineInputs<'_>,
) -> ScriptResult<Script> {
    if let Some(existing) = store.read_script(layout).await? {
        info!("resuming from persisted script.json, skipping generation");
        return Ok(existing);
    }

    let Ingested { content, page_count, content_length } = ingestion::ingest(inputs.material, inputs.bytes)?;

    let language = language::detect_language(gateway, job_id, &content).await;

    let mut script = match inputs.mode {
        ScriptMode::Overview => {
            overview::generate_overview_script(gateway, job_id, inputs.overview_prompt, &content, page_count, content_length)
                .await?
        }
        ScriptMode::Comprehensive => {
            let outline = comprehensive::generate_outline(gateway, job_id, inputs.outline_prompt, &content).await?;
            let sections = comprehensive::generate_sections(
                gateway,
                job_id,
                &outline,
                inputs.source_text,
                &content,
                None,
            )
            .await?;
            let total_duration_estimate = sections
                .iter()
                .flat_map(|s| s.segments.last())
                .map(|seg| seg.end_time)
                .sum();
            Script {
                title: outline.title,
                subject_area: outline.subject_area,
                overview: outline.overview,
                learning_objectives: outline.learning_objectives,
                sections,
                total_duration_estimate,
                mode: ScriptMode::Comprehensive,
                language: eduviz_models::DEFAULT_LANGUAGE.to_string(),
            }
        }
    };

    script.language = language;

    store.write_script(layout, &script).await?;
    info!(sections = script.section_count(), "script persisted");

    Ok(script)
}
