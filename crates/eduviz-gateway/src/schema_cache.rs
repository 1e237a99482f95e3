//! Best-effort, in-memory record of which models rejected a
//! `response_schema` request (spec §4.3 "Schema-compatibility fallback").

use std::collections::HashSet;
use std::sync::Mutex;

/// Process-wide, not persisted across restarts — a cold start simply
/// reissues the schema once and relearns the fact.
#[derive(Default)]
pub struct SchemaCompatibilityCache {
    incompatible: Mutex<HashSet<String>>,
}

impl SchemaCompatibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_incompatible(&self, model: &str) {
        self.incompatible.lock().unwrap().insert(model.to_string());
    }

    pub fn is_known_incompatible(&self, model: &str) -> bool {
        self.incompatible.lock().unwrap().contains(model)
    }
}

/// Recognizable incompatibility signatures in a provider error body
/// (spec §4.3). Kept as a short literal list rather than a general parser
/// since providers return free-text error messages.
pub fn looks_like_schema_incompatibility(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("response_schema")
        && (lower.contains("not supported") || lower.contains("invalid") || lower.contains("unsupported"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_queries_incompatibility() {
        let cache = SchemaCompatibilityCache::new();
        assert!(!cache.is_known_incompatible("gemini-x"));
        cache.mark_incompatible("gemini-x");
        assert!(cache.is_known_incompatible("gemini-x"));
    }

    #[test]
    fn detects_known_signature() {
        assert!(looks_like_schema_incompatibility(
            "Invalid JSON payload received. Unknown name \"response_schema\": not supported for this model"
        ));
        assert!(!looks_like_schema_incompatibility("rate limit exceeded"));
    }
}
