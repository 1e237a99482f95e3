//! Validation pipeline (spec §4.5.3 step 1): static structural checks are
//! done in Rust; runtime preflight and spatial checks are delegated to
//! opaque external helpers, since the engine does not itself understand
//! Python, LaTeX, or video codecs and treats generated source as opaque
//! text until it hands it to the renderer.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use crate::whitelist::SpatialWhitelist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Static,
    RuntimePreflight,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIssue {
    pub line_number: Option<usize>,
    pub severity: Severity,
    pub message: String,
    pub suggested_fix: Option<String>,
    pub frame_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub stage: ValidationStage,
    pub line_number: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_green(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Config for the external preflight/spatial helpers. Absent command
/// means that stage is skipped (treated as green) — used in tests and
/// in environments without a renderer toolchain available.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub preflight_command: Option<String>,
    pub spatial_command: Option<String>,
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            preflight_command: std::env::var("MANIM_PREFLIGHT_COMMAND").ok(),
            spatial_command: std::env::var("MANIM_SPATIAL_CHECK_COMMAND").ok(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HelperReport {
    #[serde(default)]
    errors: Vec<HelperError>,
    #[serde(default)]
    issues: Vec<HelperSpatialIssue>,
}

#[derive(Debug, Deserialize)]
struct HelperError {
    line_number: Option<usize>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct HelperSpatialIssue {
    line_number: Option<usize>,
    severity: String,
    message: String,
    #[serde(default)]
    suggested_fix: Option<String>,
    #[serde(default)]
    frame_id: Option<String>,
}

const REQUIRED_SYMBOLS: &[&str] = &["class ", "def construct"];

/// Static checks (spec §4.5.3 step 1 "Static"): syntax compile is
/// approximated by bracket balance; structural presence of the scene
/// class and construct method; import completeness is checked by the
/// scaffolder, which controls the prelude.
pub fn validate_static(source: &str) -> ValidationReport {
    let mut errors = Vec::new();

    for required in REQUIRED_SYMBOLS {
        if !source.contains(required) {
            errors.push(ValidationError {
                stage: ValidationStage::Static,
                line_number: None,
                message: format!("missing required construct: `{required}`"),
            });
        }
    }

    if let Some(line) = first_unbalanced_bracket_line(source) {
        errors.push(ValidationError {
            stage: ValidationStage::Static,
            line_number: Some(line),
            message: "unbalanced parentheses or brackets".to_string(),
        });
    }

    ValidationReport { errors }
}

fn first_unbalanced_bracket_line(source: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    for (i, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
    }
    if depth != 0 {
        Some(source.lines().count())
    } else {
        None
    }
}

/// Runtime preflight (spec §4.5.3 step 1 "Runtime preflight"): executes the
/// source under an external helper that stubs `play`/`wait` as no-ops
/// advancing a virtual clock, capturing any exception with line number and
/// type as structured JSON on stdout.
pub async fn validate_runtime_preflight(config: &ValidatorConfig, source_path: &Path) -> ValidationReport {
    let Some(command) = &config.preflight_command else {
        return ValidationReport::default();
    };

    match run_helper(command, source_path, config.timeout).await {
        Ok(report) => ValidationReport {
            errors: report
                .errors
                .into_iter()
                .map(|e| ValidationError { stage: ValidationStage::RuntimePreflight, line_number: e.line_number, message: e.message })
                .collect(),
        },
        Err(e) => {
            warn!("runtime preflight helper failed: {e}");
            ValidationReport {
                errors: vec![ValidationError { stage: ValidationStage::RuntimePreflight, line_number: None, message: e }],
            }
        }
    }
}

/// Spatial validation (spec §4.5.3 step 1 "Spatial"), run only when
/// runtime preflight is green. Delegates bounding-box/z-order/overlap
/// analysis to an external minimal-cost render helper; `severity=error`
/// issues become validation failures, `warning`/`info` are returned
/// alongside for the refiner's prompt context but do not block rendering.
///
/// A recurring `error` issue against the same section is assumed to be a
/// false positive in the external checker rather than a real overlap:
/// `whitelist` tracks repeat sightings and, once an issue has been seen
/// `SUPPRESS_AFTER` times for this section, it is dropped from the
/// blocking report for the remainder of the job (it still comes back in
/// the returned issue list for prompt context).
pub async fn validate_spatial(
    config: &ValidatorConfig,
    source_path: &Path,
    whitelist: &SpatialWhitelist,
    section_id: &str,
) -> (ValidationReport, Vec<SpatialIssue>) {
    let Some(command) = &config.spatial_command else {
        return (ValidationReport::default(), Vec::new());
    };

    let helper = match run_helper(command, source_path, config.timeout).await {
        Ok(report) => report,
        Err(e) => {
            warn!("spatial validation helper failed: {e}");
            return (
                ValidationReport {
                    errors: vec![ValidationError { stage: ValidationStage::Spatial, line_number: None, message: e }],
                },
                Vec::new(),
            );
        }
    };

    let issues: Vec<SpatialIssue> = helper
        .issues
        .into_iter()
        .map(|i| SpatialIssue {
            line_number: i.line_number,
            severity: match i.severity.as_str() {
                "error" => Severity::Error,
                "warning" => Severity::Warning,
                _ => Severity::Info,
            },
            message: i.message,
            suggested_fix: i.suggested_fix,
            frame_id: i.frame_id,
        })
        .collect();

    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .filter(|i| !whitelist.record_and_should_suppress(section_id, &i.message))
        .map(|i| ValidationError { stage: ValidationStage::Spatial, line_number: i.line_number, message: i.message.clone() })
        .collect();

    (ValidationReport { errors }, issues)
}

async fn run_helper(command: &str, source_path: &Path, timeout: Duration) -> Result<HelperReport, String> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or_else(|| "empty helper command".to_string())?;

    let output = tokio::time::timeout(
        timeout,
        Command::new(program)
            .args(parts)
            .arg(source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| "helper timed out".to_string())?
    .map_err(|e| format!("failed to spawn helper: {e}"))?;

    serde_json::from_slice(&output.stdout).map_err(|e| format!("helper produced unparsable output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_check_flags_missing_construct_method() {
        let report = validate_static("class Foo(Scene):\n    pass\n");
        assert!(!report.is_green());
    }

    #[test]
    fn static_check_flags_unbalanced_brackets() {
        let source = "class Foo(Scene):\n    def construct(self):\n        self.play(Write(title)\n";
        let report = validate_static(source);
        assert!(!report.is_green());
    }

    #[test]
    fn static_check_passes_well_formed_source() {
        let source = "class Foo(Scene):\n    def construct(self):\n        self.play(Write(title))\n";
        assert!(validate_static(source).is_green());
    }

    #[tokio::test]
    async fn missing_preflight_command_is_treated_as_green() {
        let config = ValidatorConfig { preflight_command: None, spatial_command: None, timeout: Duration::from_secs(1) };
        let report = validate_runtime_preflight(&config, Path::new("/tmp/does-not-exist.py")).await;
        assert!(report.is_green());
    }

    #[tokio::test]
    async fn missing_spatial_command_is_treated_as_green_and_skips_whitelist() {
        let config = ValidatorConfig { preflight_command: None, spatial_command: None, timeout: Duration::from_secs(1) };
        let whitelist = SpatialWhitelist::new();
        let (report, issues) = validate_spatial(&config, Path::new("/tmp/does-not-exist.py"), &whitelist, "sec_0").await;
        assert!(report.is_green());
        assert!(issues.is_empty());
    }
}
