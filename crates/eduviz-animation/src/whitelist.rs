//! Visual-QC false-positive whitelist (spec §9 Open Questions: "the
//! 'whitelist' referenced by the visual-QC false-positive logs implies a
//! persistence store not otherwise defined; treat it as an in-process,
//! best-effort cache unless a store is supplied").
//!
//! Spatial issues recurring for the same section/message pair are assumed
//! to be false positives in the external spatial checker rather than real
//! overlaps, and are suppressed after they have been seen enough times.

use std::collections::HashMap;
use std::sync::Mutex;

/// Number of repeat sightings of the same issue before it is suppressed.
const SUPPRESS_AFTER: u32 = 3;

#[derive(Default)]
pub struct SpatialWhitelist {
    seen: Mutex<HashMap<String, u32>>,
}

impl SpatialWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(section_id: &str, message: &str) -> String {
        format!("{section_id}::{message}")
    }

    /// Records a sighting and returns whether this issue should now be
    /// suppressed as a likely false positive.
    pub fn record_and_should_suppress(&self, section_id: &str, message: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let count = seen.entry(Self::key(section_id, message)).or_insert(0);
        *count += 1;
        *count >= SUPPRESS_AFTER
    }

    pub fn is_whitelisted(&self, section_id: &str, message: &str) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.get(&Self::key(section_id, message)).is_some_and(|&c| c >= SUPPRESS_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_after_repeat_sightings() {
        let whitelist = SpatialWhitelist::new();
        for _ in 0..SUPPRESS_AFTER - 1 {
            assert!(!whitelist.record_and_should_suppress("sec_0", "overlap near title"));
        }
        assert!(whitelist.record_and_should_suppress("sec_0", "overlap near title"));
        assert!(whitelist.is_whitelisted("sec_0", "overlap near title"));
    }

    #[test]
    fn distinct_sections_tracked_independently() {
        let whitelist = SpatialWhitelist::new();
        whitelist.record_and_should_suppress("sec_0", "overlap");
        assert!(!whitelist.is_whitelisted("sec_1", "overlap"));
    }
}
