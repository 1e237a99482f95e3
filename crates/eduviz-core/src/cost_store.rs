//! Shared, append-only Cost Record store (spec §3 Ownership, §9 "Global
//! mutable state").
//!
//! A single [`CostStore`] instance is constructed at startup and shared via
//! `Arc` across every LLM Gateway call site; reads never block writers and
//! writers are serialized by an internal lock. Per-job summaries are
//! derived by filtering the append log, matching the source's pattern of a
//! single cumulative store queried per job at completion time.

use std::sync::Arc;

use eduviz_models::{CostRecord, CostSummary};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    job_id: String,
    record: CostRecord,
}

#[derive(Default)]
struct Inner {
    log: Vec<Entry>,
}

/// Process-wide cost ledger. Cheap to clone (wraps an `Arc`).
#[derive(Clone)]
pub struct CostStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for CostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CostStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Append a cost record for `job_id`. Append-only: never mutates or
    /// removes prior entries (P8 cost monotonicity).
    pub async fn record(&self, job_id: &str, record: CostRecord) {
        let mut inner = self.inner.write().await;
        inner.log.push(Entry {
            job_id: job_id.to_string(),
            record,
        });
    }

    /// Aggregate every record recorded for `job_id` so far.
    pub async fn summary_for_job(&self, job_id: &str) -> CostSummary {
        let inner = self.inner.read().await;
        let mut summary = CostSummary::default();
        for entry in inner.log.iter().filter(|e| e.job_id == job_id) {
            summary.record(&entry.record);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aggregates_only_matching_job_regardless_of_interleaving() {
        let store = CostStore::new();
        store
            .record("job-a", CostRecord { model: "m1".into(), input_tokens: 10, output_tokens: 5, dollars: 0.01 })
            .await;
        store
            .record("job-b", CostRecord { model: "m1".into(), input_tokens: 99, output_tokens: 99, dollars: 9.0 })
            .await;
        store
            .record("job-a", CostRecord { model: "m2".into(), input_tokens: 20, output_tokens: 8, dollars: 0.02 })
            .await;

        let summary = store.summary_for_job("job-a").await;
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.total_input_tokens, 30);
        assert!((summary.total_dollars - 0.03).abs() < 1e-9);
    }
}
