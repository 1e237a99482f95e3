//! Atomic edit application (spec §4.5.3 step 5, P4 edit atomicity).

use eduviz_models::{Patch, PatchOutcome};
use regex::Regex;

/// A single edit's outcome, paired with its reason for the next turn's
/// history (spec §4.5.3 step 4: "compressed history ... edit counts").
#[derive(Debug, Clone)]
pub struct EditRecord {
    pub outcome: PatchOutcome,
    pub reason: Option<String>,
}

/// Attempts to apply every patch to `source`. Either every patch applies
/// and the new buffer is returned, or none do and the original buffer is
/// returned unchanged (P4). Per-edit outcomes are always reported so the
/// caller can build the next turn's history regardless of overall success.
pub fn apply_patches(source: &str, patches: &[Patch]) -> (String, Vec<EditRecord>) {
    let mut records = Vec::with_capacity(patches.len());
    let mut buffer = source.to_string();
    let mut all_ok = true;

    for patch in patches {
        let outcome = classify_patch(&buffer, patch);
        if outcome.is_success() {
            buffer = apply_one(&buffer, patch);
        } else {
            all_ok = false;
        }
        records.push(EditRecord { outcome, reason: patch.reason.clone() });
    }

    if all_ok {
        (buffer, records)
    } else {
        (source.to_string(), records)
    }
}

fn classify_patch(buffer: &str, patch: &Patch) -> PatchOutcome {
    if patch.search.is_empty() {
        return PatchOutcome::EmptySearch;
    }

    let exact_matches = buffer.matches(patch.search.as_str()).count();
    if exact_matches == 1 {
        return PatchOutcome::Applied;
    }
    if exact_matches > 1 {
        return PatchOutcome::Ambiguous;
    }

    // Fall back to a whitespace-normalized match (spec §3 Patch invariant).
    match whitespace_flexible_regex(&patch.search) {
        Some(re) => match re.find_iter(buffer).count() {
            0 => PatchOutcome::NotFound,
            1 => PatchOutcome::Applied,
            _ => PatchOutcome::Ambiguous,
        },
        None => PatchOutcome::NotFound,
    }
}

fn apply_one(buffer: &str, patch: &Patch) -> String {
    if buffer.matches(patch.search.as_str()).count() == 1 {
        return buffer.replacen(&patch.search, &patch.replace, 1);
    }
    // Whitespace-normalized match: replace the single regex match span.
    if let Some(re) = whitespace_flexible_regex(&patch.search) {
        return re.replacen(buffer, 1, patch.replace.as_str()).into_owned();
    }
    buffer.to_string()
}

/// Builds a regex that matches `search` with runs of whitespace treated as
/// flexible, so a reformatted (but textually identical) buffer still
/// matches once (spec §3: "or match once after whitespace normalization").
fn whitespace_flexible_regex(search: &str) -> Option<Regex> {
    let tokens: Vec<&str> = search.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    let pattern = tokens.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join(r"\s+");
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(search: &str, replace: &str) -> Patch {
        Patch { search: search.to_string(), replace: replace.to_string(), reason: None }
    }

    #[test]
    fn applies_single_unambiguous_edit() {
        let source = "self.play(Write(title))\nself.wait(1)\n";
        let (out, records) = apply_patches(source, &[patch("self.wait(1)", "self.wait(2)")]);
        assert_eq!(out, "self.play(Write(title))\nself.wait(2)\n");
        assert!(records[0].outcome.is_success());
    }

    #[test]
    fn rejects_empty_search() {
        let source = "x = 1\n";
        let (out, records) = apply_patches(source, &[patch("", "y = 2")]);
        assert_eq!(out, source);
        assert_eq!(records[0].outcome, PatchOutcome::EmptySearch);
    }

    #[test]
    fn rejects_missing_search() {
        let source = "x = 1\n";
        let (out, records) = apply_patches(source, &[patch("y = 2", "z = 3")]);
        assert_eq!(out, source);
        assert_eq!(records[0].outcome, PatchOutcome::NotFound);
    }

    #[test]
    fn rejects_ambiguous_search() {
        let source = "x = 1\nx = 1\n";
        let (out, records) = apply_patches(source, &[patch("x = 1", "x = 2")]);
        assert_eq!(out, source);
        assert_eq!(records[0].outcome, PatchOutcome::Ambiguous);
    }

    #[test]
    fn applies_after_whitespace_normalization() {
        let source = "self.play(\n    Write(title)\n)\n";
        let (out, records) = apply_patches(source, &[patch("self.play( Write(title) )", "self.play(FadeIn(title))")]);
        assert!(records[0].outcome.is_success());
        assert_eq!(out, "self.play(FadeIn(title))\n");
    }

    #[test]
    fn all_or_nothing_when_one_edit_in_a_batch_fails() {
        let source = "a = 1\nb = 2\n";
        let patches = vec![patch("a = 1", "a = 9"), patch("missing", "c = 3")];
        let (out, records) = apply_patches(source, &patches);
        assert_eq!(out, source, "no edits should be committed when any edit in the batch fails");
        assert!(records[0].outcome.is_success());
        assert_eq!(records[1].outcome, PatchOutcome::NotFound);
    }
}
