//! On-disk layout (spec §6) and path-safety resolution (P3).
//!
//! ```text
//! <root>/<job_id>/
//!   script.json
//!   final_video.mp4
//!   video_info.json
//!   error_info.json
//!   cost_summary.json
//!   translations/<lang>/final_video.mp4
//!   sections/
//!     merged_<i>.mp4
//!     <i>/
//!       status
//!       section_audio.mp3
//!       audio.mp3
//!       seg_<k>/audio.mp3
//!       scene_<i>.py
//!       final_section.mp4
//!       media/...
//!       llm_calls.jsonl
//! ```

use std::path::{Path, PathBuf};

use eduviz_models::is_safe_id;

use crate::error::{StoreError, StoreResult};

/// Root-anchored job directory layout. Every method resolves a path
/// guaranteed to have `root` as a proper ancestor, or returns
/// [`StoreError::InvalidId`] with no filesystem side effect (P3).
#[derive(Debug, Clone)]
pub struct JobLayout {
    root: PathBuf,
    job_id: String,
}

fn resolve_child(root: &Path, id: &str) -> StoreResult<PathBuf> {
    if !is_safe_id(id) {
        return Err(StoreError::invalid_id(id));
    }
    let candidate = root.join(id);
    // is_safe_id already forbids `/` and `..`, but double-check the
    // resolved path still has `root` as a proper ancestor.
    if candidate.parent() != Some(root) {
        return Err(StoreError::invalid_id(id));
    }
    Ok(candidate)
}

impl JobLayout {
    pub fn new(root: impl Into<PathBuf>, job_id: impl Into<String>) -> StoreResult<Self> {
        let root = root.into();
        let job_id = job_id.into();
        // Validate early so construction itself can never escape the root.
        resolve_child(&root, &job_id)?;
        Ok(Self { root, job_id })
    }

    pub fn job_dir(&self) -> PathBuf {
        self.root.join(&self.job_id)
    }

    pub fn sections_dir(&self) -> PathBuf {
        self.job_dir().join("sections")
    }

    pub fn section_dir(&self, index: usize) -> PathBuf {
        self.sections_dir().join(index.to_string())
    }

    pub fn section_status_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("status")
    }

    pub fn section_audio_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("section_audio.mp3")
    }

    pub fn section_alias_audio_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("audio.mp3")
    }

    pub fn segment_audio_path(&self, index: usize, segment: usize) -> PathBuf {
        self.section_dir(index)
            .join(format!("seg_{}", segment))
            .join("audio.mp3")
    }

    pub fn scene_source_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join(format!("scene_{}.py", index))
    }

    pub fn final_section_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("final_section.mp4")
    }

    pub fn section_media_dir(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("media")
    }

    pub fn section_llm_log_path(&self, index: usize) -> PathBuf {
        self.section_dir(index).join("llm_calls.jsonl")
    }

    pub fn merged_convenience_copy(&self, index: usize) -> PathBuf {
        self.sections_dir().join(format!("merged_{}.mp4", index))
    }

    pub fn script_path(&self) -> PathBuf {
        self.job_dir().join("script.json")
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.job_dir().join("final_video.mp4")
    }

    pub fn video_info_path(&self) -> PathBuf {
        self.job_dir().join("video_info.json")
    }

    pub fn error_info_path(&self) -> PathBuf {
        self.job_dir().join("error_info.json")
    }

    pub fn cost_summary_path(&self) -> PathBuf {
        self.job_dir().join("cost_summary.json")
    }

    pub fn translations_dir(&self) -> PathBuf {
        self.job_dir().join("translations")
    }

    /// Resolves a translation target language directory. Rejects unsafe
    /// language codes the same way job/section ids are rejected (P3).
    pub fn translation_video_path(&self, lang: &str) -> StoreResult<PathBuf> {
        let lang_dir = resolve_child(&self.translations_dir(), lang)?;
        Ok(lang_dir.join("final_video.mp4"))
    }
}

/// Resolve an analysis id against the configured analysis root
/// (spec §6: `<root>/analysis/<analysis_id>.json`).
pub fn analysis_path(analysis_root: &Path, analysis_id: &str) -> StoreResult<PathBuf> {
    if !is_safe_id(analysis_id) {
        return Err(StoreError::invalid_id(analysis_id));
    }
    let path = analysis_root.join(format!("{analysis_id}.json"));
    if path.parent() != Some(analysis_root) {
        return Err(StoreError::invalid_id(analysis_id));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_job_id() {
        let root = PathBuf::from("/tmp/eduviz-root");
        let err = JobLayout::new(&root, "../escape").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_embedded_slash() {
        let root = PathBuf::from("/tmp/eduviz-root");
        assert!(JobLayout::new(&root, "a/b").is_err());
    }

    #[test]
    fn accepts_safe_id_and_stays_under_root() {
        let root = PathBuf::from("/tmp/eduviz-root");
        let layout = JobLayout::new(&root, "job-123").unwrap();
        assert!(layout.job_dir().starts_with(&root));
        assert!(layout.section_dir(2).starts_with(&root));
    }

    #[test]
    fn analysis_path_rejects_traversal() {
        let root = PathBuf::from("/tmp/eduviz-analysis");
        assert!(analysis_path(&root, "../../etc/passwd").is_err());
        assert!(analysis_path(&root, "abc123").is_ok());
    }
}
