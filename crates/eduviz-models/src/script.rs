//! The Script record (spec §3) and the supported language table (spec §4.4
//! Stage B).

use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

use crate::job::ScriptMode;
use crate::section::Section;

/// A mapping produced exactly once per job: title, subject area, overview,
/// learning objectives, ordered sections, total-duration estimate.
///
/// Persisted as a single `script.json` file; read-only thereafter except
/// for attaching realized artifact paths (spec §4.4 Stage E).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub subject_area: String,
    pub overview: String,
    pub learning_objectives: Vec<String>,
    pub sections: Vec<Section>,
    pub total_duration_estimate: f64,
    pub mode: ScriptMode,
    pub language: String,
}

impl Script {
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn find_section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    /// Invariant check: every section id is unique within the script.
    pub fn has_unique_section_ids(&self) -> bool {
        let mut ids: Vec<&str> = self.sections.iter().map(|s| s.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        ids.len() == before
    }
}

/// JSON schema shape the LLM Gateway enforces for outline generation
/// (spec §4.4 Stage C, comprehensive mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionOutlineEntry {
    pub id: String,
    pub title: String,
    pub section_type: String,
    pub content_to_cover: String,
    pub key_points: Vec<String>,
    pub visual_type: String,
    pub estimated_duration_seconds: f64,
    #[serde(default)]
    pub page_start: Option<u32>,
    #[serde(default)]
    pub page_end: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outline {
    pub title: String,
    pub subject_area: String,
    pub overview: String,
    pub learning_objectives: Vec<String>,
    pub sections_outline: Vec<SectionOutlineEntry>,
}

/// The closed set of 2-letter language codes Stage B validates against.
/// Defaults to `en` on any detection failure.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "nl", "pl", "ru", "tr", "ar", "hi", "zh", "ja", "ko", "vi",
    "th", "id", "sv", "fi", "da", "no", "cs", "el", "he", "uk", "ro",
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

pub const DEFAULT_LANGUAGE: &str = "en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_language_falls_back() {
        assert!(!is_supported_language("xx"));
        assert!(is_supported_language("en"));
    }

    #[test]
    fn duplicate_section_ids_detected() {
        let mut script = Script {
            title: "T".into(),
            subject_area: "S".into(),
            overview: "O".into(),
            learning_objectives: vec![],
            sections: vec![],
            total_duration_estimate: 0.0,
            mode: ScriptMode::Overview,
            language: "en".into(),
        };
        assert!(script.has_unique_section_ids());
        script.sections.push(crate::section::Section {
            id: "a".into(),
            title: "A".into(),
            narration: "".into(),
            tts_narration: "".into(),
            segments: vec![],
            supporting_data: vec![],
            source_page_range: None,
            artifacts: Default::default(),
        });
        script.sections.push(script.sections[0].clone());
        assert!(!script.has_unique_section_ids());
    }
}
