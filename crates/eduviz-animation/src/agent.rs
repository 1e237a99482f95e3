//! The Animation Agent (C5) state machine: `Plan -> Implement -> Validate
//! -> (Patch -> Validate)* -> Done | Abandoned`, plus the `Correct` step
//! consumed by the Section Processor's own `Render -> Correct -> Render`
//! loop (spec §4.5.3 "State machine" / "Fallback path").
//!
//! Rendering itself is owned by the Section Processor (C6) — this crate
//! never invokes the renderer subprocess; it only produces and repairs
//! source text.

use std::path::Path;

use eduviz_gateway::Gateway;
use eduviz_models::Section;
use tracing::{info, warn};

use crate::choreographer::{self, ChoreographerInput};
use crate::error::{AnimationError, AnimationResult};
use crate::implementer;
use crate::refiner::{self, RefinerConfig};
use crate::refiner::validate::SpatialIssue;
use crate::scaffolder::{self, Scaffolded};
use crate::whitelist::SpatialWhitelist;

/// `Render -> Correct` transitions are bounded by this many corrections
/// per section (spec §4.5.3 "Render → Correct at most MAX_CORRECTION_ATTEMPTS
/// times (default 3)"). Owned here because the correction step itself is
/// an Animation Agent operation; the render/retry loop lives in C6.
pub const MAX_CORRECTION_ATTEMPTS: u32 = 3;

/// Base temperature for the Implementer; raised by the caller on
/// section-level retries to diversify repeated attempts.
pub const BASE_TEMPERATURE: f32 = 0.4;

pub struct AnimationOutcome {
    pub source: String,
    pub class_name: String,
    pub prelude_lines: usize,
    pub residual_issues: Vec<SpatialIssue>,
}

/// Runs `Plan -> Implement -> Validate -> (Patch -> Validate)*` for one
/// section, producing a stabilized source file. `scene_path` is where the
/// agent keeps the working copy on disk for the refiner's external
/// validators.
pub async fn produce_animation(
    gateway: &Gateway,
    job_id: &str,
    section: &Section,
    target_duration: f64,
    style: &str,
    language: &str,
    temperature: f32,
    scene_path: &Path,
    whitelist: &SpatialWhitelist,
) -> AnimationResult<AnimationOutcome> {
    let class_name = scaffolder::safe_class_name(&section.class_name());
    let narration = section.narration.as_str();
    let hints = visual_hints(section);

    let plan_input = ChoreographerInput {
        narration,
        segment_count: section.segments.len(),
        target_duration,
        style,
        language,
        visual_hints: &hints,
    };
    let plan = choreographer::generate_plan(gateway, job_id, &plan_input).await?;

    let snippet = implementer::generate_snippet(gateway, job_id, &plan, target_duration, temperature).await?;
    let Scaffolded { source, prelude_lines } = scaffolder::scaffold(&class_name, &snippet);

    match stabilize(gateway, job_id, &section.id, source, scene_path, whitelist).await {
        Ok(refined) => Ok(AnimationOutcome { source: refined.source, class_name, prelude_lines, residual_issues: refined.residual_issues }),
        Err(AnimationError::Refinement(attempts)) => {
            warn!(attempts, "refiner exhausted; falling through to full-rewrite correction");
            let rewritten = refiner::full_rewrite(
                gateway,
                job_id,
                "adaptive refinement exhausted its turn budget without stabilizing",
                &class_name,
            )
            .await?;
            let Scaffolded { source, prelude_lines } = scaffolder::scaffold(&class_name, &rewritten);

            match stabilize(gateway, job_id, &section.id, source, scene_path, whitelist).await {
                Ok(refined) => {
                    Ok(AnimationOutcome { source: refined.source, class_name, prelude_lines, residual_issues: refined.residual_issues })
                }
                Err(_) => Err(AnimationError::Abandoned),
            }
        }
        Err(other) => Err(other),
    }
}

async fn stabilize(
    gateway: &Gateway,
    job_id: &str,
    section_id: &str,
    source: String,
    scene_path: &Path,
    whitelist: &SpatialWhitelist,
) -> AnimationResult<refiner::Refined> {
    refiner::refine(gateway, job_id, section_id, source, scene_path, &RefinerConfig::default(), whitelist).await
}

/// Extracts free-text hints from a section's opaque supporting data — the
/// engine never interprets these items beyond `recreate_in_video`, but a
/// human-readable `kind` is a reasonable steer for the choreographer.
fn visual_hints(section: &Section) -> Vec<String> {
    section
        .supporting_data
        .iter()
        .filter(|item| !item.recreate_in_video)
        .map(|item| item.kind.clone())
        .collect()
}

/// The `Render -> Correct` step (spec §4.5.3 fallback path, §4.6 step 5):
/// called by the Section Processor after a real renderer failure, with the
/// renderer's own stderr tail. Produces a corrected source file via
/// full-rewrite-then-refine; the caller re-invokes the renderer on the
/// result and decides whether to call this again (up to
/// [`MAX_CORRECTION_ATTEMPTS`]) or abandon the section.
pub async fn correct_after_render_failure(
    gateway: &Gateway,
    job_id: &str,
    section_id: &str,
    class_name: &str,
    renderer_stderr_tail: &str,
    scene_path: &Path,
    whitelist: &SpatialWhitelist,
) -> AnimationResult<AnimationOutcome> {
    let rewritten = refiner::full_rewrite(gateway, job_id, renderer_stderr_tail, class_name).await?;
    let Scaffolded { source, prelude_lines } = scaffolder::scaffold(class_name, &rewritten);

    let refined = stabilize(gateway, job_id, section_id, source, scene_path, whitelist).await?;
    info!(class_name, "correction produced a stabilized source file");
    Ok(AnimationOutcome { source: refined.source, class_name: class_name.to_string(), prelude_lines, residual_issues: refined.residual_issues })
}
