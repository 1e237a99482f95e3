//! Job identity and lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, externally supplied job identifier. Must satisfy
/// [`crate::ids::is_safe_id`] before it is ever used to derive a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle: `created -> (script_generated -> sections_in_progress) ->
/// completed | failed | interrupted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobLifecycle {
    #[default]
    Created,
    ScriptGenerated,
    SectionsInProgress,
    Completed,
    Failed,
    Interrupted,
}

impl JobLifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobLifecycle::Completed | JobLifecycle::Failed | JobLifecycle::Interrupted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobLifecycle::Created => "created",
            JobLifecycle::ScriptGenerated => "script_generated",
            JobLifecycle::SectionsInProgress => "sections_in_progress",
            JobLifecycle::Completed => "completed",
            JobLifecycle::Failed => "failed",
            JobLifecycle::Interrupted => "interrupted",
        }
    }
}

/// Single-line, atomically-written section status marker (spec §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    GeneratingAudio,
    GeneratingAnimation,
    FixingError,
    Completed,
}

impl SectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::GeneratingAudio => "generating_audio",
            SectionStatus::GeneratingAnimation => "generating_animation",
            SectionStatus::FixingError => "fixing_error",
            SectionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generating_audio" => Some(SectionStatus::GeneratingAudio),
            "generating_animation" => Some(SectionStatus::GeneratingAnimation),
            "fixing_error" => Some(SectionStatus::FixingError),
            "completed" => Some(SectionStatus::Completed),
            _ => None,
        }
    }
}

/// Generation mode selected for the Script Pipeline (spec §4.4 Stage C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptMode {
    Overview,
    Comprehensive,
}

/// Source document kind (spec §4.4 Stage A).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceMaterial {
    Pdf { path: String },
    Image { path: String, mime_type: String },
    Text { content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_terminal_states() {
        assert!(JobLifecycle::Completed.is_terminal());
        assert!(JobLifecycle::Failed.is_terminal());
        assert!(JobLifecycle::Interrupted.is_terminal());
        assert!(!JobLifecycle::Created.is_terminal());
        assert!(!JobLifecycle::SectionsInProgress.is_terminal());
    }

    #[test]
    fn section_status_roundtrip() {
        for s in [
            SectionStatus::GeneratingAudio,
            SectionStatus::GeneratingAnimation,
            SectionStatus::FixingError,
            SectionStatus::Completed,
        ] {
            assert_eq!(SectionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SectionStatus::parse("bogus"), None);
    }
}
