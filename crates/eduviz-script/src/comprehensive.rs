//! Stage C, comprehensive mode (spec §4.4): outline-then-sections
//! generation, sections produced sequentially to preserve narrative
//! coherence.

use std::collections::HashSet;

use eduviz_gateway::{ContentPart, Gateway, GenerateConfig, GenerateOpts, ResponseFormat, Turn};
use eduviz_models::{Outline, Script, ScriptMode, Section, SectionOutlineEntry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ScriptError, ScriptResult};
use crate::segmentation::segment_narration;

pub const MAX_OUTLINE_ATTEMPTS: u32 = 3;
const SECTION_RETRY_COUNT: u32 = 3;
const TAIL_CHARS: usize = 200;
const MAX_RELEVANT_PARAGRAPHS: usize = 3;

/// Phase 1: one gateway call returning the outline schema, with up to
/// [`MAX_OUTLINE_ATTEMPTS`] attempts; malformed/truncated JSON appends a
/// strict-JSON suffix on retry.
pub async fn generate_outline(
    gateway: &Gateway,
    job_id: &str,
    base_prompt: &str,
    content: &ContentPart,
) -> ScriptResult<Outline> {
    let schema = schemars::schema_for!(Outline);
    let config = GenerateConfig {
        response_format: ResponseFormat::Json,
        response_schema: Some(serde_json::to_value(&schema).unwrap_or_default()),
        require_json_valid: true,
        max_retries: 1,
        ..Default::default()
    };

    let mut prompt = base_prompt.to_string();
    for attempt in 0..MAX_OUTLINE_ATTEMPTS {
        let opts = GenerateOpts {
            contents: Some(vec![Turn {
                role: "user".to_string(),
                parts: vec![ContentPart::Text(prompt.clone()), content.clone()],
            }]),
            ..Default::default()
        };

        let result = gateway.generate(job_id, &prompt, &config, &opts).await;
        if !result.success {
            warn!(attempt, "outline generation attempt failed: {:?}", result.error);
            prompt = strict_json_suffix(base_prompt);
            continue;
        }

        match result.parsed_json.and_then(|v| serde_json::from_value(v).ok()) {
            Some(outline) => return Ok(outline),
            None => {
                warn!(attempt, "outline response did not match schema");
                prompt = strict_json_suffix(base_prompt);
            }
        }
    }

    Err(ScriptError::OutlineExhausted(MAX_OUTLINE_ATTEMPTS))
}

fn strict_json_suffix(base_prompt: &str) -> String {
    format!(
        "{base_prompt}\n\nSTRICT: respond with a single complete, valid JSON object matching the schema. \
No markdown fences, no trailing commentary, no truncation."
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct SectionDraft {
    narration: String,
    #[serde(default)]
    references_figure: bool,
}

/// Phase 2: sections generated sequentially (not in parallel), each
/// carrying a compressed tail of prior sections plus keyword-selected
/// source passages.
pub async fn generate_sections(
    gateway: &Gateway,
    job_id: &str,
    outline: &Outline,
    source_text: &str,
    source_content: &ContentPart,
    page_sliced_content: Option<&dyn Fn(u32, u32) -> ContentPart>,
) -> ScriptResult<Vec<Section>> {
    let titles: Vec<&str> = outline.sections_outline.iter().map(|s| s.title.as_str()).collect();
    let total = outline.sections_outline.len();
    let mut sections = Vec::with_capacity(total);

    for (index, entry) in outline.sections_outline.iter().enumerate() {
        let position = position_note(index, total);
        let tail = compressed_tail(&sections);
        let passages = select_passages(source_text, entry, index, total);

        let prompt = format!(
            "Outline (all section titles): {}\n\nPosition: {}\n\n{}\n\nSection to write now:\nid={}\ntitle={}\ntype={}\ncontent_to_cover={}\nkey_points={}\n\nRelevant source passages:\n{}\n\nWrite this section's narration as a complete, self-contained script segment.",
            titles.join(" | "),
            position,
            tail,
            entry.id,
            entry.title,
            entry.section_type,
            entry.content_to_cover,
            entry.key_points.join("; "),
            passages,
        );

        let content = match (page_sliced_content, entry.page_start, entry.page_end) {
            (Some(slicer), Some(start), Some(end)) => slicer(start, end),
            _ => source_content.clone(),
        };

        let section = generate_one_section(gateway, job_id, entry, &prompt, &content).await?;
        sections.push(section);
    }

    Ok(sections)
}

async fn generate_one_section(
    gateway: &Gateway,
    job_id: &str,
    entry: &SectionOutlineEntry,
    prompt: &str,
    content: &ContentPart,
) -> ScriptResult<Section> {
    let schema = schemars::schema_for!(SectionDraft);
    let config = GenerateConfig {
        response_format: ResponseFormat::Json,
        response_schema: Some(serde_json::to_value(&schema).unwrap_or_default()),
        require_json_valid: true,
        max_retries: SECTION_RETRY_COUNT,
        ..Default::default()
    };
    let opts = GenerateOpts {
        contents: Some(vec![Turn {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(prompt.to_string()), content.clone()],
        }]),
        ..Default::default()
    };

    let result = gateway.generate(job_id, prompt, &config, &opts).await;
    if !result.success {
        return Err(ScriptError::from_gateway_result(
            &format!("section '{}' generation", entry.id),
            result.error,
        ));
    }

    let value = result.parsed_json.ok_or_else(|| ScriptError::Gateway("missing parsed_json".into()))?;
    let draft: SectionDraft = serde_json::from_value(value)?;

    let mut supporting_data = Vec::new();
    if draft.references_figure {
        supporting_data.push(eduviz_models::SupportingDataItem::referenced_content());
    }

    let mut section = Section {
        id: entry.id.clone(),
        title: entry.title.clone(),
        tts_narration: draft.narration.clone(),
        narration: draft.narration,
        segments: vec![],
        supporting_data,
        source_page_range: match (entry.page_start, entry.page_end) {
            (Some(start), Some(end)) => Some(eduviz_models::PageRange { start, end }),
            _ => None,
        },
        artifacts: Default::default(),
    };
    section.segments = segment_narration(&section.tts_narration);
    Ok(section)
}

fn position_note(index: usize, total: usize) -> &'static str {
    if index == 0 {
        "first"
    } else if index + 1 == total {
        "last"
    } else {
        "middle"
    }
}

/// Titles plus the last ~[`TAIL_CHARS`] chars of the prior narration and
/// the one before it (spec §4.4 Stage C Sections).
fn compressed_tail(sections: &[Section]) -> String {
    if sections.is_empty() {
        return "No prior sections.".to_string();
    }
    let recent = sections.iter().rev().take(2).collect::<Vec<_>>();
    let mut parts = Vec::new();
    for section in recent.into_iter().rev() {
        let tail: String = section
            .narration
            .chars()
            .rev()
            .take(TAIL_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        parts.push(format!("[{}] ...{}", section.title, tail));
    }
    format!("Previously: {}", parts.join(" | "))
}

const STOPWORDS: &[&str] = &[
    "the", "and", "that", "this", "with", "from", "have", "which", "their", "there", "about", "into",
];

fn content_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Bag-of-content-words scored by paragraph overlap, falling back to an
/// overlapping sliding window anchored at the section index when nothing
/// scores above zero.
fn select_passages(source_text: &str, entry: &SectionOutlineEntry, index: usize, total: usize) -> String {
    let query = content_words(&format!("{} {} {}", entry.title, entry.content_to_cover, entry.key_points.join(" ")));
    if query.is_empty() {
        return sliding_window(source_text, index, total);
    }

    let paragraphs: Vec<&str> = source_text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();
    if paragraphs.is_empty() {
        return String::new();
    }

    let mut scored: Vec<(usize, &str)> = paragraphs
        .iter()
        .map(|&p| {
            let words = content_words(p);
            let overlap = query.intersection(&words).count();
            (overlap, p)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let top: Vec<&str> = scored.iter().take(MAX_RELEVANT_PARAGRAPHS).filter(|(s, _)| *s > 0).map(|(_, p)| *p).collect();

    if top.is_empty() {
        sliding_window(source_text, index, total)
    } else {
        top.join("\n\n")
    }
}

fn sliding_window(source_text: &str, index: usize, total: usize) -> String {
    if source_text.is_empty() || total == 0 {
        return String::new();
    }
    let len = source_text.chars().count();
    let window = (len / total.max(1)).max(1);
    let start = index.saturating_mul(window).min(len);
    let end = (start + window * 2).min(len);
    source_text.chars().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_covers_different_ranges_per_index() {
        let text: String = (0..1000).map(|i| char::from((b'a' + (i % 26) as u8) as char)).collect();
        let first = sliding_window(&text, 0, 5);
        let last = sliding_window(&text, 4, 5);
        assert_ne!(first, last);
    }

    #[test]
    fn select_passages_falls_back_when_no_overlap() {
        let entry = SectionOutlineEntry {
            id: "s1".into(),
            title: "Zzzznomatch".into(),
            section_type: "concept".into(),
            content_to_cover: "qqqqnothing".into(),
            key_points: vec![],
            visual_type: "diagram".into(),
            estimated_duration_seconds: 60.0,
            page_start: None,
            page_end: None,
        };
        let passage = select_passages("Paragraph one about cats.\n\nParagraph two about dogs.", &entry, 0, 2);
        assert!(!passage.is_empty());
    }

    #[test]
    fn compressed_tail_reports_no_prior_sections_initially() {
        assert_eq!(compressed_tail(&[]), "No prior sections.");
    }
}
