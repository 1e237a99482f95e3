//! Text-to-speech (spec §6, external collaborator (d)): synthesizes one
//! audio file per Narration Segment and concatenates them losslessly into
//! `section_audio.mp3` (FFmpeg template 1). The TTS backend itself is an
//! opaque subprocess, invoked the same way the renderer is — this crate
//! never links a TTS engine in-process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use std::io::Write;

use eduviz_models::NarrationSegment;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe;

#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Interpreter invoking the TTS script, e.g. `python3`.
    pub python_bin: String,
    /// Script or module path passed to the interpreter.
    pub script: String,
    pub default_voice: String,
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            python_bin: std::env::var("TTS_PYTHON").unwrap_or_else(|_| "python3".to_string()),
            script: std::env::var("TTS_SCRIPT").unwrap_or_else(|_| "tools/eduviz_tts.py".to_string()),
            default_voice: std::env::var("TTS_DEFAULT_VOICE").unwrap_or_else(|_| "en-US-Neural".to_string()),
            timeout: Duration::from_secs(
                std::env::var("TTS_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(60),
            ),
        }
    }
}

/// Synthesizes `text` to `output_path`, invoking the configured TTS
/// backend as a subprocess.
pub async fn synthesize(config: &TtsConfig, text: &str, voice: Option<&str>, output_path: &Path) -> MediaResult<()> {
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let voice = voice.unwrap_or(&config.default_voice);

    let child = Command::new(&config.python_bin)
        .arg(&config.script)
        .arg("--text")
        .arg(text)
        .arg("--output")
        .arg(output_path)
        .arg("--voice")
        .arg(voice)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let result = tokio::time::timeout(config.timeout, child.wait_with_output()).await;
    let output = match result {
        Ok(res) => res?,
        Err(_) => return Err(MediaError::Timeout(config.timeout.as_secs())),
    };

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "TTS backend failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// Synthesizes every Narration Segment of a section in index order
/// (spec §4.6 step 2: "always TTS'd and concatenated in index order"),
/// writing each to `seg_<k>/audio.mp3` under `section_dir`.
pub async fn synthesize_segments(
    config: &TtsConfig,
    segments: &[NarrationSegment],
    voice: Option<&str>,
    section_dir: &Path,
) -> MediaResult<Vec<PathBuf>> {
    let mut ordered: Vec<&NarrationSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.segment_index);

    let mut paths = Vec::with_capacity(ordered.len());
    for segment in ordered {
        let path = section_dir.join(format!("seg_{}", segment.segment_index)).join("audio.mp3");
        synthesize(config, &segment.text, voice, &path).await?;
        paths.push(path);
    }
    Ok(paths)
}

/// Concatenates segment audio files losslessly into `out` (FFmpeg
/// template 1: `ffmpeg -y -f concat -safe 0 -i <list> -c copy <out>`),
/// then probes the result for its real duration.
pub async fn concat_segment_audio(paths: &[PathBuf], out: &Path) -> MediaResult<f64> {
    if paths.is_empty() {
        return Err(MediaError::internal("no narration segments to concatenate"));
    }
    if paths.len() == 1 {
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&paths[0], out).await?;
        return probe::get_duration(out).await;
    }

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let mut list_file = NamedTempFile::new()?;
    for path in paths {
        let line = format!("file '{}'\n", path.display());
        list_file.write_all(line.as_bytes())?;
    }
    list_file.flush()?;

    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    debug!(count = paths.len(), out = %out.display(), "concatenating narration segment audio");

    let output = Command::new("ffmpeg")
        .args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(list_file.path())
        .args(["-c", "copy"])
        .arg(out)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "audio concat failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    probe::get_duration(out).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_segment_list() {
        let err = concat_segment_audio(&[], Path::new("/tmp/out.mp3")).await.unwrap_err();
        assert!(matches!(err, MediaError::Internal(_)));
    }
}
