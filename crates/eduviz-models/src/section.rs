//! Section and Narration Segment records (spec §3).

use serde::{Deserialize, Serialize};

/// A timed sub-utterance of a section's narration; the unit of TTS.
///
/// Invariant (P5): within a section, segments form a contiguous,
/// non-overlapping timeline starting at 0 — `end_time[i] == start_time[i+1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSegment {
    pub text: String,
    pub estimated_duration: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub segment_index: usize,
}

/// An opaque, structured supporting-data item handed to the Animation Agent.
/// The engine never interprets its contents beyond the `recreate_in_video`
/// flag used by the overview-mode self-containment check (spec §4.4 Stage C).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingDataItem {
    pub kind: String,
    #[serde(default)]
    pub recreate_in_video: bool,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl SupportingDataItem {
    pub fn referenced_content() -> Self {
        Self {
            kind: "referenced_content".to_string(),
            recreate_in_video: true,
            data: serde_json::Value::Null,
        }
    }
}

/// A page range within the source document a section was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

/// Realized, on-disk artifacts attached to a section once C6 has processed
/// it. `None` fields mean the corresponding stage has not yet run (or the
/// section was abandoned before reaching it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionArtifacts {
    pub video_path: Option<String>,
    pub audio_path: Option<String>,
    pub animation_source_path: Option<String>,
    pub duration: Option<f64>,
}

/// Ordered position within a script.
///
/// Invariant: `id` is unique within a script and matches `[A-Za-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable id; PascalCased into a renderer class name by the Scaffolder.
    pub id: String,
    pub title: String,
    /// Human-readable narration text.
    pub narration: String,
    /// Pronunciation-normalized narration actually sent to TTS.
    pub tts_narration: String,
    pub segments: Vec<NarrationSegment>,
    pub supporting_data: Vec<SupportingDataItem>,
    pub source_page_range: Option<PageRange>,
    #[serde(default)]
    pub artifacts: SectionArtifacts,
}

impl Section {
    /// `[A-Za-z0-9_-]+` "my_section-1" -> "MySection1".
    pub fn class_name(&self) -> String {
        self.id
            .split(['_', '-'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }

    pub fn is_abandoned(&self) -> bool {
        self.artifacts.video_path.is_none() && self.artifacts.audio_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str) -> Section {
        Section {
            id: id.to_string(),
            title: "Intro".to_string(),
            narration: "Hello".to_string(),
            tts_narration: "Hello".to_string(),
            segments: vec![],
            supporting_data: vec![],
            source_page_range: None,
            artifacts: SectionArtifacts::default(),
        }
    }

    #[test]
    fn class_name_pascal_cases_ids() {
        assert_eq!(section("intro_section-1").class_name(), "IntroSection1");
        assert_eq!(section("overview").class_name(), "Overview");
    }
}
