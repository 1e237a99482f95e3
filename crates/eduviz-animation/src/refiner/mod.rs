//! Refiner (Adaptive Fixer Loop, spec §4.5.3): validate → classify →
//! select context → prompt for structured edits → apply atomically,
//! repeated up to [`MAX_REFINEMENT_ATTEMPTS`] turns.

pub mod classify;
pub mod context;
pub mod edit;
pub mod history;
pub mod validate;

use std::path::Path;

use eduviz_gateway::{Gateway, GenerateConfig, GenerateOpts, ResponseFormat, Turn};
use eduviz_models::{Patch, StructuredEditResponse};
use tracing::{info, warn};

use self::classify::{classify, Strategy};
use self::edit::apply_patches;
use self::history::{render_history, TurnStatus, TurnSummary};
use self::validate::{validate_runtime_preflight, validate_spatial, validate_static, SpatialIssue, ValidatorConfig};
use crate::error::{AnimationError, AnimationResult};
use crate::whitelist::SpatialWhitelist;

/// No explicit default is given in the governing design notes for this
/// constant (unlike `MAX_CORRECTION_ATTEMPTS`); five turns gives the loop
/// room to converge without letting a stuck section burn the whole
/// section-level retry budget on refinement alone.
pub const MAX_REFINEMENT_ATTEMPTS: u32 = 5;

const MAX_EDITS_PER_TURN: usize = 10;
const MAX_ANALYSIS_CHARS: usize = 200;

pub struct RefinerConfig {
    pub max_attempts: u32,
    pub validator: ValidatorConfig,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self { max_attempts: MAX_REFINEMENT_ATTEMPTS, validator: ValidatorConfig::default() }
    }
}

pub struct Refined {
    pub source: String,
    /// Warning/info-level spatial issues that survived but did not block
    /// rendering.
    pub residual_issues: Vec<SpatialIssue>,
}

/// Runs the adaptive fixer loop. `scene_path` is where the caller keeps the
/// current source on disk; the refiner rewrites it before each validation
/// pass so the external preflight/spatial helpers always see the latest
/// buffer. `section_id` keys the job-scoped `whitelist` that suppresses
/// spatial issues which keep recurring for this section.
pub async fn refine(
    gateway: &Gateway,
    job_id: &str,
    section_id: &str,
    source: String,
    scene_path: &Path,
    config: &RefinerConfig,
    whitelist: &SpatialWhitelist,
) -> AnimationResult<Refined> {
    let mut buffer = source;
    let mut turns: Vec<TurnSummary> = Vec::new();

    for attempt in 1..=config.max_attempts {
        tokio::fs::write(scene_path, &buffer).await?;

        let (report, residual_issues) = validate_all(&config.validator, &buffer, scene_path, whitelist, section_id).await;
        if report.errors.is_empty() {
            info!(attempt, "refiner stabilized");
            return Ok(Refined { source: buffer, residual_issues });
        }

        let primary = &report.errors[0];
        let strategy = classify(&primary.message);
        let error_lines: Vec<usize> = report.errors.iter().filter_map(|e| e.line_number).collect();
        let excerpt = context::select_excerpt(&buffer, &error_lines);
        let history_block = render_history(&turns);

        let prompt = build_prompt(&excerpt, &report_text(&report.errors), strategy, &history_block);
        let schema = schemars::schema_for!(StructuredEditResponse);
        let gen_config = GenerateConfig {
            response_format: ResponseFormat::Json,
            response_schema: Some(serde_json::to_value(&schema).unwrap_or_default()),
            require_json_valid: true,
            max_retries: 2,
            ..Default::default()
        };
        let opts = GenerateOpts { contents: Some(vec![Turn::user(prompt.clone())]), ..Default::default() };

        let result = gateway.generate(job_id, &prompt, &gen_config, &opts).await;
        let Some(parsed) = result.parsed_json.filter(|_| result.success) else {
            warn!(attempt, "refiner turn produced no usable edit response");
            turns.push(TurnSummary::new(attempt, TurnStatus::Failed, strategy, &[], result.error));
            continue;
        };

        let response: StructuredEditResponse = match serde_json::from_value(parsed) {
            Ok(r) => r,
            Err(e) => {
                warn!(attempt, "refiner edit response did not match schema: {e}");
                turns.push(TurnSummary::new(attempt, TurnStatus::Failed, strategy, &[], Some(e.to_string())));
                continue;
            }
        };

        let patches: Vec<Patch> = response
            .edits
            .into_iter()
            .take(MAX_EDITS_PER_TURN)
            .map(|e| Patch { search: e.search_text, replace: e.replacement_text, reason: Some(truncate(&response.analysis, MAX_ANALYSIS_CHARS)) })
            .collect();

        let (next_buffer, outcomes) = apply_patches(&buffer, &patches);
        let changed = next_buffer != buffer;
        buffer = next_buffer;

        let outcome_list: Vec<_> = outcomes.iter().map(|r| r.outcome.clone()).collect();
        turns.push(TurnSummary::new(attempt, TurnStatus::Failed, strategy, &outcome_list, Some(response.analysis)));

        if !changed {
            warn!(attempt, "no edit in this turn applied; buffer unchanged");
        }
    }

    Err(AnimationError::Refinement(config.max_attempts))
}

async fn validate_all(
    config: &ValidatorConfig,
    buffer: &str,
    scene_path: &Path,
    whitelist: &SpatialWhitelist,
    section_id: &str,
) -> (validate::ValidationReport, Vec<SpatialIssue>) {
    let static_report = validate_static(buffer);
    if !static_report.is_green() {
        return (static_report, Vec::new());
    }

    let preflight_report = validate_runtime_preflight(config, scene_path).await;
    if !preflight_report.is_green() {
        return (preflight_report, Vec::new());
    }

    validate_spatial(config, scene_path, whitelist, section_id).await
}

fn build_prompt(excerpt: &str, errors: &str, strategy: Strategy, history: &str) -> String {
    let hints = strategy.hints().join("; ");
    format!(
        "The following Manim scene source has a validation failure classified as `{strategy_name}`.\n\
Errors:\n{errors}\n\nHints: {hints}\n\nRecent attempt history:\n{history}\n\n\
Source excerpt:\n{excerpt}\n\n\
Produce at most {max_edits} minimal search/replace edits that fix the error. \
`search_text` must match the excerpt exactly once.",
        strategy_name = strategy.as_str(),
        max_edits = MAX_EDITS_PER_TURN,
    )
}

fn report_text(errors: &[validate::ValidationError]) -> String {
    errors.iter().map(|e| format!("{:?} line {:?}: {}", e.stage, e.line_number, e.message)).collect::<Vec<_>>().join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// The full-rewrite fallback (spec §4.5.3 "Fallback path"): a single
/// gateway call with a focused error excerpt produces a complete
/// replacement snippet body, which is handed back to [`refine`] once more
/// by the caller.
pub async fn full_rewrite(gateway: &Gateway, job_id: &str, stderr_tail: &str, class_name: &str) -> AnimationResult<String> {
    let prompt = format!(
        "The Manim scene `{class_name}` failed to render after repeated targeted fixes. \
Here is the last part of the renderer's error output:\n{stderr_tail}\n\n\
Write a complete replacement for the body of the construct method (no class or imports), \
avoiding the pattern that caused this failure. Wrap it in a single fenced code block."
    );
    let config = GenerateConfig { response_format: ResponseFormat::Text, max_retries: 2, ..Default::default() };
    let opts = GenerateOpts { contents: Some(vec![Turn::user(prompt.clone())]), ..Default::default() };

    let result = gateway.generate(job_id, &prompt, &config, &opts).await;
    if !result.success {
        return Err(AnimationError::Gateway(result.error.unwrap_or_else(|| "full-rewrite call failed".to_string())));
    }
    Ok(crate::implementer::clean_snippet(&result.response))
}
