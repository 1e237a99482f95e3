//! Job Store (C1): durable per-job directory tree, atomic status writes,
//! resume discovery (spec §4.1).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eduviz_models::{JobLifecycle, Script, SectionStatus};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::layout::JobLayout;

/// Job-level bookkeeping written alongside the section status markers so the
/// cleanup scheduler and stale-job detector (spec §9 supplement) can reason
/// about a job without a distributed database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    pub lifecycle: JobLifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobMeta {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            lifecycle: JobLifecycle::Created,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for JobMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`JobStore::inspect`] — the evidence a resumed job is
/// reconstructed from.
#[derive(Debug, Clone, Default)]
pub struct JobState {
    pub has_script: bool,
    pub script: Option<Script>,
    pub completed_sections: Vec<usize>,
    pub has_final_video: bool,
    pub total_sections: usize,
}

/// Cleanup mode for [`JobStore::cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Delete everything except `final_video.mp4`, `video_info.json`,
    /// `error_info.json`, `cost_summary.json`, and `translations/`.
    KeepFinalOnly,
    /// Delete the whole job tree.
    Expired,
}

/// Maps job ids to directory trees; handle owned by a single orchestrator
/// coroutine per job (spec §5).
#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates `<root>/<id>/` and `<root>/<id>/sections/` if absent.
    /// Fails with `InvalidId` (no filesystem side effect) if `id` does not
    /// match the safe-id pattern or would escape `root`.
    pub async fn open_job(&self, id: &str) -> StoreResult<JobLayout> {
        let layout = JobLayout::new(&self.root, id)?;
        fs::create_dir_all(layout.sections_dir()).await?;
        Ok(layout)
    }

    /// Reconstructs job state from on-disk evidence: a section is
    /// considered complete if either `merged_<i>.mp4` or
    /// `<section_dir>/final_section.mp4` exists.
    pub async fn inspect(&self, id: &str) -> StoreResult<JobState> {
        let layout = JobLayout::new(&self.root, id)?;

        if !layout.job_dir().exists() {
            return Ok(JobState::default());
        }

        let script = match fs::read(layout.script_path()).await {
            Ok(bytes) => Some(serde_json::from_slice::<Script>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let total_sections = script.as_ref().map(|s| s.section_count()).unwrap_or(0);

        let mut completed_sections = Vec::new();
        for i in 0..total_sections {
            let merged = layout.merged_convenience_copy(i);
            let final_section = layout.final_section_path(i);
            if merged.exists() || final_section.exists() {
                completed_sections.push(i);
            }
        }

        Ok(JobState {
            has_script: script.is_some(),
            script,
            completed_sections,
            has_final_video: layout.final_video_path().exists(),
            total_sections,
        })
    }

    /// Atomically writes a single-line status file: `<status>[\t<detail>]\n`
    /// via temp-write + rename.
    pub async fn write_status(
        &self,
        section_dir: &Path,
        status: SectionStatus,
        detail: Option<&str>,
    ) -> StoreResult<()> {
        fs::create_dir_all(section_dir).await?;
        let final_path = section_dir.join("status");
        let tmp_path = section_dir.join(".status.tmp");

        let line = match detail {
            Some(d) => format!("{}\t{}\n", status.as_str(), d),
            None => format!("{}\n", status.as_str()),
        };

        fs::write(&tmp_path, line.as_bytes()).await?;
        fs::rename(&tmp_path, &final_path).await?;
        debug!("wrote status {:?} to {}", status, final_path.display());
        Ok(())
    }

    /// Reads back a previously written status file, if any.
    pub async fn read_status(&self, section_dir: &Path) -> StoreResult<Option<(SectionStatus, Option<String>)>> {
        let path = section_dir.join("status");
        let contents = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let line = contents.trim_end_matches('\n');
        let (status_str, detail) = match line.split_once('\t') {
            Some((s, d)) => (s, Some(d.to_string())),
            None => (line, None),
        };
        Ok(SectionStatus::parse(status_str).map(|s| (s, detail)))
    }

    /// Persists the script exactly once (spec §4.4 Stage E).
    pub async fn write_script(&self, layout: &JobLayout, script: &Script) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(script)?;
        let tmp = layout.job_dir().join(".script.json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, layout.script_path()).await?;
        Ok(())
    }

    pub async fn read_script(&self, layout: &JobLayout) -> StoreResult<Option<Script>> {
        match fs::read(layout.script_path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn job_meta_path(layout: &JobLayout) -> PathBuf {
        layout.job_dir().join("job_meta.json")
    }

    /// Writes job-level lifecycle bookkeeping, atomically, bumping
    /// `updated_at` every call so the cleanup scheduler and stale-job
    /// detector can measure idle time.
    pub async fn write_job_meta(&self, layout: &JobLayout, mut meta: JobMeta) -> StoreResult<()> {
        meta.updated_at = Utc::now();
        let bytes = serde_json::to_vec_pretty(&meta)?;
        let path = Self::job_meta_path(layout);
        let tmp = layout.job_dir().join(".job_meta.json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn read_job_meta(&self, layout: &JobLayout) -> StoreResult<Option<JobMeta>> {
        match fs::read(Self::job_meta_path(layout)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate every job directory currently present under the root.
    pub async fn list_job_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        Ok(ids)
    }

    /// `KeepFinalOnly` deletes everything in the job directory except the
    /// terminal artifacts; `Expired` deletes the whole tree. Active-status
    /// directories are never deleted by the periodic scheduler (enforced by
    /// the caller in [`crate::cleanup`]); this method performs the deletion
    /// once a mode has already been decided.
    pub async fn cleanup(&self, id: &str, mode: CleanupMode) -> StoreResult<()> {
        let layout = JobLayout::new(&self.root, id)?;
        let job_dir = layout.job_dir();
        if !job_dir.exists() {
            return Ok(());
        }

        match mode {
            CleanupMode::Expired => {
                fs::remove_dir_all(&job_dir).await?;
                info!("deleted expired job directory {}", job_dir.display());
            }
            CleanupMode::KeepFinalOnly => {
                let keep: Vec<PathBuf> = vec![
                    layout.final_video_path(),
                    layout.video_info_path(),
                    layout.error_info_path(),
                    layout.cost_summary_path(),
                    layout.translations_dir(),
                ];

                let mut entries = fs::read_dir(&job_dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if keep.iter().any(|k| k == &path) {
                        continue;
                    }
                    if path.is_dir() {
                        fs::remove_dir_all(&path).await.unwrap_or_else(|e| {
                            warn!("failed to remove {}: {}", path.display(), e)
                        });
                    } else {
                        fs::remove_file(&path).await.unwrap_or_else(|e| {
                            warn!("failed to remove {}: {}", path.display(), e)
                        });
                    }
                }
                info!("cleaned up job {} (keep_final_only)", id);
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduviz_models::JobLifecycle;
    use tempfile::TempDir;

    fn store() -> (TempDir, JobStore) {
        let dir = TempDir::new().unwrap();
        let store = JobStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn open_job_rejects_traversal() {
        let (_dir, store) = store();
        let err = store.open_job("../escape").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn open_job_creates_tree() {
        let (_dir, store) = store();
        let layout = store.open_job("job-1").await.unwrap();
        assert!(layout.sections_dir().exists());
    }

    #[tokio::test]
    async fn status_roundtrips_atomically() {
        let (_dir, store) = store();
        let layout = store.open_job("job-1").await.unwrap();
        let section_dir = layout.section_dir(0);
        store
            .write_status(&section_dir, SectionStatus::GeneratingAudio, None)
            .await
            .unwrap();
        let (status, detail) = store.read_status(&section_dir).await.unwrap().unwrap();
        assert_eq!(status, SectionStatus::GeneratingAudio);
        assert!(detail.is_none());

        store
            .write_status(&section_dir, SectionStatus::FixingError, Some("name_error"))
            .await
            .unwrap();
        let (status, detail) = store.read_status(&section_dir).await.unwrap().unwrap();
        assert_eq!(status, SectionStatus::FixingError);
        assert_eq!(detail.as_deref(), Some("name_error"));
    }

    #[tokio::test]
    async fn inspect_reports_absent_job_as_empty() {
        let (_dir, store) = store();
        let state = store.inspect("never-opened").await.unwrap();
        assert!(!state.has_script);
        assert!(state.completed_sections.is_empty());
    }

    #[tokio::test]
    async fn inspect_finds_completed_sections_by_disk_evidence() {
        let (_dir, store) = store();
        let layout = store.open_job("job-2").await.unwrap();

        let script = Script {
            title: "T".into(),
            subject_area: "S".into(),
            overview: "O".into(),
            learning_objectives: vec![],
            sections: vec![
                make_section("a"),
                make_section("b"),
            ],
            total_duration_estimate: 10.0,
            mode: eduviz_models::ScriptMode::Overview,
            language: "en".into(),
        };
        store.write_script(&layout, &script).await.unwrap();

        fs::create_dir_all(layout.section_dir(0)).await.unwrap();
        fs::write(layout.final_section_path(0), b"fake").await.unwrap();

        let state = store.inspect("job-2").await.unwrap();
        assert!(state.has_script);
        assert_eq!(state.completed_sections, vec![0]);
        assert_eq!(state.total_sections, 2);
        let _ = JobLifecycle::Created;
    }

    fn make_section(id: &str) -> eduviz_models::Section {
        eduviz_models::Section {
            id: id.to_string(),
            title: id.to_string(),
            narration: String::new(),
            tts_narration: String::new(),
            segments: vec![],
            supporting_data: vec![],
            source_page_range: None,
            artifacts: Default::default(),
        }
    }

    #[tokio::test]
    async fn cleanup_keep_final_only_preserves_terminal_artifacts() {
        let (_dir, store) = store();
        let layout = store.open_job("job-3").await.unwrap();
        fs::write(layout.final_video_path(), b"video").await.unwrap();
        fs::write(layout.video_info_path(), b"{}").await.unwrap();
        fs::create_dir_all(layout.section_dir(0)).await.unwrap();

        store.cleanup("job-3", CleanupMode::KeepFinalOnly).await.unwrap();

        assert!(layout.final_video_path().exists());
        assert!(layout.video_info_path().exists());
        assert!(!layout.section_dir(0).exists());
    }

    #[tokio::test]
    async fn cleanup_expired_deletes_whole_tree() {
        let (_dir, store) = store();
        let layout = store.open_job("job-4").await.unwrap();
        store.cleanup("job-4", CleanupMode::Expired).await.unwrap();
        assert!(!layout.job_dir().exists());
    }
}
