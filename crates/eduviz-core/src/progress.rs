//! Progress Tracker (C2): in-memory job state + percent/stage callbacks
//! (spec §4.2).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::trace;

/// User-supplied callback invoked from the owning job's task. Must not
/// block — the spec requires callbacks be non-blocking since they run
/// inline with job progress.
pub type ProgressCallback = Arc<dyn Fn(&str, u8, &str) + Send + Sync>;

#[derive(Default)]
struct Inner {
    completed: HashSet<usize>,
    failed: HashSet<usize>,
}

/// Single source of truth for "what is done" per job while in memory.
/// All mutations are serialized per job via the internal mutex, modeling
/// the single-goroutine-per-job ownership rule (spec §4.2, §5).
pub struct ProgressTracker {
    inner: Mutex<Inner>,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            callback,
        }
    }

    /// Seed the tracker from Job Store evidence on resume.
    pub async fn seed_completed(&self, indices: impl IntoIterator<Item = usize>) {
        let mut inner = self.inner.lock().await;
        inner.completed.extend(indices);
    }

    pub async fn mark_section_complete(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        inner.completed.insert(index);
        inner.failed.remove(&index);
    }

    pub async fn mark_section_failed(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        inner.failed.insert(index);
    }

    pub async fn is_section_complete(&self, index: usize) -> bool {
        self.inner.lock().await.completed.contains(&index)
    }

    pub async fn completed_count(&self) -> usize {
        self.inner.lock().await.completed.len()
    }

    /// Invokes the user-supplied callback if present.
    pub fn report_stage_progress(&self, stage: &str, percent: u8, message: &str) {
        trace!(stage, percent, message, "stage progress");
        if let Some(cb) = &self.callback {
            cb(stage, percent, message);
        }
    }

    pub fn report_section_progress(&self, done: usize, total: usize, cached: bool) {
        let percent = if total == 0 {
            0
        } else {
            ((done as f64 / total as f64) * 100.0).min(100.0) as u8
        };
        let message = if cached {
            format!("{}/{} sections (cached)", done, total)
        } else {
            format!("{}/{} sections", done, total)
        };
        self.report_stage_progress("sections", percent, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    #[tokio::test]
    async fn marks_and_queries_completion() {
        let tracker = ProgressTracker::new(None);
        assert!(!tracker.is_section_complete(0).await);
        tracker.mark_section_complete(0).await;
        assert!(tracker.is_section_complete(0).await);
        assert_eq!(tracker.completed_count().await, 1);
    }

    #[tokio::test]
    async fn failed_then_complete_clears_failed() {
        let tracker = ProgressTracker::new(None);
        tracker.mark_section_failed(1).await;
        tracker.mark_section_complete(1).await;
        assert!(tracker.is_section_complete(1).await);
    }

    #[tokio::test]
    async fn callback_invoked_on_report() {
        let last_percent = Arc::new(AtomicU8::new(0));
        let last_percent_clone = Arc::clone(&last_percent);
        let tracker = ProgressTracker::new(Some(Arc::new(move |_stage: &str, pct: u8, _msg: &str| {
            last_percent_clone.store(pct, Ordering::SeqCst);
        })));
        tracker.report_section_progress(2, 4, false);
        assert_eq!(last_percent.load(Ordering::SeqCst), 50);
    }
}
