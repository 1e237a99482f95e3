//! Search/Replace Patch (spec §3) — a single surgical edit applied
//! atomically by the Refiner.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Invariant: `search` must be non-empty and must match the current code
/// exactly once, or match once after whitespace normalization; otherwise
/// the patch is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Patch {
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The structured-edit schema the Refiner prompts the LLM Gateway against
/// (spec §4.5.3 step 4): `{analysis (<=200 chars), edits[] (<=10)}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredEdit {
    pub search_text: String,
    pub replacement_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredEditResponse {
    pub analysis: String,
    pub edits: Vec<StructuredEdit>,
}

/// Outcome of attempting to apply a single patch (P4 edit atomicity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchOutcome {
    Applied,
    NotFound,
    Ambiguous,
    EmptySearch,
}

impl PatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PatchOutcome::Applied)
    }
}
