//! Job Store, Progress Tracker, Cost Store, and the periodic cleanup
//! scheduler (spec §4.1, §4.2).

pub mod cleanup;
pub mod cost_store;
pub mod error;
pub mod layout;
pub mod progress;
pub mod store;

pub use cleanup::{detect_stale_jobs, run_cleanup_pass, spawn_cleanup_scheduler, CleanupConfig};
pub use cost_store::CostStore;
pub use error::{StoreError, StoreResult};
pub use layout::{analysis_path, JobLayout};
pub use progress::{ProgressCallback, ProgressTracker};
pub use store::{CleanupMode, JobMeta, JobState, JobStore};
