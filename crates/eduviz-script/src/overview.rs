//! Stage C, overview mode (spec §4.4): single-call script generation with
//! post-validation and a bounded corrective retry.

use eduviz_gateway::{ContentPart, Gateway, GenerateConfig, GenerateOpts, GenerateResult, ResponseFormat, Turn};
use eduviz_models::{Script, ScriptMode, Section, SupportingDataItem};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ScriptError, ScriptResult};
use crate::segmentation::segment_narration;

pub const MIN_SECTIONS: usize = 5;
pub const MAX_SECTIONS: usize = 8;
pub const MIN_WORDS: usize = 80;
pub const MAX_WORDS: usize = 170;
pub const MIN_DURATION_SECONDS: f64 = 180.0;
pub const MAX_DURATION_SECONDS: f64 = 420.0;
pub const CHARS_PER_SECOND: f64 = 12.5;
pub const CONSTRAINT_RETRY_COUNT: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct DraftSection {
    id: String,
    title: String,
    narration: String,
    #[serde(default)]
    references_figure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct OverviewDraft {
    title: String,
    subject_area: String,
    overview: String,
    learning_objectives: Vec<String>,
    sections: Vec<DraftSection>,
}

struct Violation {
    description: String,
}

fn validate(draft: &OverviewDraft) -> Vec<Violation> {
    let mut violations = Vec::new();

    if draft.sections.len() < MIN_SECTIONS || draft.sections.len() > MAX_SECTIONS {
        violations.push(Violation {
            description: format!(
                "expected {}-{} sections, got {}",
                MIN_SECTIONS,
                MAX_SECTIONS,
                draft.sections.len()
            ),
        });
    }

    for section in &draft.sections {
        let words = section.narration.split_whitespace().count();
        if words < MIN_WORDS || words > MAX_WORDS {
            violations.push(Violation {
                description: format!(
                    "section '{}' has {} words, expected {}-{}",
                    section.id, words, MIN_WORDS, MAX_WORDS
                ),
            });
        }
    }

    let total_duration = total_duration_estimate(draft);
    if total_duration < MIN_DURATION_SECONDS || total_duration > MAX_DURATION_SECONDS {
        violations.push(Violation {
            description: format!(
                "total estimated duration {:.0}s outside [{:.0}, {:.0}]",
                total_duration, MIN_DURATION_SECONDS, MAX_DURATION_SECONDS
            ),
        });
    }

    violations
}

fn total_duration_estimate(draft: &OverviewDraft) -> f64 {
    draft
        .sections
        .iter()
        .map(|s| s.narration.chars().count() as f64 / CHARS_PER_SECOND)
        .sum()
}

fn violation_report(violations: &[Violation], page_count: Option<usize>, content_length: usize) -> String {
    let lines: Vec<String> = violations.iter().map(|v| format!("- {}", v.description)).collect();
    format!(
        "The previous draft violated these constraints:\n{}\n\nMaterial size: {} pages, {} chars. \
Revise to satisfy {}-{} sections, {}-{} words per section, {:.0}-{:.0}s total duration.",
        lines.join("\n"),
        page_count.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string()),
        content_length,
        MIN_SECTIONS,
        MAX_SECTIONS,
        MIN_WORDS,
        MAX_WORDS,
        MIN_DURATION_SECONDS,
        MAX_DURATION_SECONDS,
    )
}

async fn call_gateway(
    gateway: &Gateway,
    job_id: &str,
    prompt: &str,
    content: &ContentPart,
) -> ScriptResult<GenerateResult> {
    let schema = schemars::schema_for!(OverviewDraft);
    let config = GenerateConfig {
        response_format: ResponseFormat::Json,
        response_schema: Some(serde_json::to_value(&schema).unwrap_or_default()),
        require_json_valid: true,
        max_retries: 2,
        ..Default::default()
    };
    let opts = GenerateOpts {
        contents: Some(vec![Turn {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(prompt.to_string()), content.clone()],
        }]),
        ..Default::default()
    };

    Ok(gateway.generate(job_id, prompt, &config, &opts).await)
}

/// Generates a compact overview-mode script (spec §4.4 Stage C), applying
/// up to [`CONSTRAINT_RETRY_COUNT`] corrective retries before returning
/// best effort.
pub async fn generate_overview_script(
    gateway: &Gateway,
    job_id: &str,
    base_prompt: &str,
    content: &ContentPart,
    page_count: Option<usize>,
    content_length: usize,
) -> ScriptResult<Script> {
    let mut prompt = base_prompt.to_string();
    let mut last_draft: Option<OverviewDraft> = None;

    for attempt in 0..=CONSTRAINT_RETRY_COUNT {
        let result = call_gateway(gateway, job_id, &prompt, content).await?;
        if !result.success {
            return Err(ScriptError::from_gateway_result("overview generation", result.error));
        }

        let value = result.parsed_json.ok_or_else(|| ScriptError::Gateway("missing parsed_json".into()))?;
        let draft: OverviewDraft = serde_json::from_value(value)?;

        let violations = validate(&draft);
        if violations.is_empty() {
            return Ok(finalize(draft));
        }

        warn!(attempt, violation_count = violations.len(), "overview draft violated constraints");
        if attempt < CONSTRAINT_RETRY_COUNT {
            prompt = format!("{}\n\n{}", base_prompt, violation_report(&violations, page_count, content_length));
        }
        last_draft = Some(draft);
    }

    info!("returning best-effort overview script after exhausting corrective retries");
    Ok(finalize(last_draft.expect("loop runs at least once")))
}

fn finalize(draft: OverviewDraft) -> Script {
    let total_duration_estimate = total_duration_estimate(&draft);

    let sections = draft
        .sections
        .into_iter()
        .map(|d| {
            let mut supporting_data = Vec::new();
            if d.references_figure {
                supporting_data.push(SupportingDataItem::referenced_content());
            }
            Section {
                id: d.id,
                title: d.title,
                tts_narration: d.narration.clone(),
                narration: d.narration,
                segments: vec![],
                supporting_data,
                source_page_range: None,
                artifacts: Default::default(),
            }
        })
        .map(|mut section| {
            section.segments = segment_narration(&section.tts_narration);
            section
        })
        .collect();

    Script {
        title: draft.title,
        subject_area: draft.subject_area,
        overview: draft.overview,
        learning_objectives: draft.learning_objectives,
        sections,
        total_duration_estimate,
        mode: ScriptMode::Overview,
        language: eduviz_models::DEFAULT_LANGUAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_with_sections(n: usize, words_per_section: usize) -> OverviewDraft {
        let narration = (0..words_per_section).map(|_| "word").collect::<Vec<_>>().join(" ");
        OverviewDraft {
            title: "T".into(),
            subject_area: "S".into(),
            overview: "O".into(),
            learning_objectives: vec![],
            sections: (0..n)
                .map(|i| DraftSection {
                    id: format!("s{i}"),
                    title: format!("Section {i}"),
                    narration: narration.clone(),
                    references_figure: false,
                })
                .collect(),
        }
    }

    #[test]
    fn valid_draft_has_no_violations() {
        let draft = draft_with_sections(6, 120);
        assert!(validate(&draft).is_empty());
    }

    #[test]
    fn too_few_sections_is_a_violation() {
        let draft = draft_with_sections(2, 120);
        assert!(!validate(&draft).is_empty());
    }

    #[test]
    fn short_narration_is_a_violation() {
        let draft = draft_with_sections(6, 5);
        assert!(!validate(&draft).is_empty());
    }
}
