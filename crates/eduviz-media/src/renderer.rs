//! Renderer invocation (spec §6): the Manim-like animation renderer is
//! invoked as an opaque subprocess, never linked in-process. Quality is
//! looked up from a fixed flag table and output is located under the
//! renderer's own `<media_dir>/videos/<scene_stem>/<quality_subdir>/`
//! convention, then validated by presence, size, and a probe call.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use crate::probe;

/// Render quality, mapped to the renderer's own `-q*` flags and the
/// `quality_subdir` it writes output under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderQuality {
    Low,
    Medium,
    High,
    FourK,
}

impl RenderQuality {
    pub fn flag(self) -> &'static str {
        match self {
            RenderQuality::Low => "-ql",
            RenderQuality::Medium => "-qm",
            RenderQuality::High => "-qh",
            RenderQuality::FourK => "-qk",
        }
    }

    /// The subdirectory name the renderer writes its own quality tier
    /// under (e.g. Manim's `480p15`, `1080p60`, `2160p60`).
    fn subdir(self) -> &'static str {
        match self {
            RenderQuality::Low => "480p15",
            RenderQuality::Medium => "720p30",
            RenderQuality::High => "1080p60",
            RenderQuality::FourK => "2160p60",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Interpreter invoking the renderer module, e.g. `python3`.
    pub python_bin: String,
    /// Renderer module passed to `-m`, e.g. `manim`.
    pub renderer_module: String,
    pub quality: RenderQuality,
    pub timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            python_bin: std::env::var("MANIM_PYTHON").unwrap_or_else(|_| "python3".to_string()),
            renderer_module: std::env::var("MANIM_MODULE").unwrap_or_else(|_| "manim".to_string()),
            quality: RenderQuality::Low,
            timeout: Duration::from_secs(
                std::env::var("MANIM_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(180),
            ),
        }
    }
}

pub struct RenderOutcome {
    pub video_path: PathBuf,
    pub duration: f64,
}

/// Runs the renderer on `scene_file`/`scene_class_name`, producing
/// `section_<index>` under `media_dir/videos/<scene_stem>/<quality_subdir>/`.
/// Per spec §4.6 step 4, callers must clean the scene's partial-movie-fragment
/// directory and any stale prior output before calling this.
pub async fn render_scene(
    config: &RendererConfig,
    scene_file: &Path,
    scene_class_name: &str,
    media_dir: &Path,
    index: usize,
) -> MediaResult<RenderOutcome> {
    let output_file = format!("section_{index}");
    let args = [
        "-m",
        &config.renderer_module,
        config.quality.flag(),
        "--format=mp4",
        &format!("--output_file={output_file}"),
        &format!("--media_dir={}", media_dir.display()),
        scene_file.to_string_lossy().as_ref(),
        scene_class_name,
    ];

    let child = Command::new(&config.python_bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let result = tokio::time::timeout(config.timeout, child.wait_with_output()).await;
    let output = match result {
        Ok(res) => res?,
        Err(_) => {
            return Err(MediaError::Timeout(config.timeout.as_secs()));
        }
    };

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "renderer exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    let scene_stem = scene_file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let video_path = media_dir
        .join("videos")
        .join(&scene_stem)
        .join(config.quality.subdir())
        .join(format!("{output_file}.mp4"));

    validate_rendered_output(&video_path).await?;
    let info = probe::probe_video(&video_path).await?;

    Ok(RenderOutcome { video_path, duration: info.duration })
}

const MIN_OUTPUT_BYTES: u64 = 1024;

async fn validate_rendered_output(path: &Path) -> MediaResult<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::InvalidVideo(format!("renderer produced no output at {}", path.display())))?;
    if meta.len() < MIN_OUTPUT_BYTES {
        return Err(MediaError::InvalidVideo(format!(
            "renderer output at {} is only {} bytes",
            path.display(),
            meta.len()
        )));
    }
    Ok(())
}

/// Removes the renderer's partial-movie-fragment cache and any stale
/// output for `scene_stem` before a (re-)render (spec §4.6 step 4).
pub async fn clean_scene_media(media_dir: &Path, scene_stem: &str) -> MediaResult<()> {
    let scene_media = media_dir.join("videos").join(scene_stem);
    if scene_media.exists() {
        tokio::fs::remove_dir_all(&scene_media).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_flags_match_spec_table() {
        assert_eq!(RenderQuality::Low.flag(), "-ql");
        assert_eq!(RenderQuality::Medium.flag(), "-qm");
        assert_eq!(RenderQuality::High.flag(), "-qh");
        assert_eq!(RenderQuality::FourK.flag(), "-qk");
    }

    #[tokio::test]
    async fn validate_rejects_missing_output() {
        let err = validate_rendered_output(Path::new("/nonexistent/section_0.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }
}
