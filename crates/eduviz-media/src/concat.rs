//! Final video concatenation (spec §4.7 step 7, §6 FFmpeg concat demuxer):
//! stream-copies the included section videos into one file, falling back
//! to a re-encode when stream copy fails — mismatched codec parameters
//! across sections are common enough that the fallback isn't optional.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const CONCAT_TIMEOUT: Duration = Duration::from_secs(300);

/// Concatenates `paths`, in order, into `out`.
pub async fn concat_videos(paths: &[PathBuf], out: &Path) -> MediaResult<()> {
    if paths.is_empty() {
        return Err(MediaError::internal("no section videos to concatenate"));
    }
    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if paths.len() == 1 {
        tokio::fs::copy(&paths[0], out).await?;
        return Ok(());
    }

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let mut list_file = NamedTempFile::new()?;
    for path in paths {
        let line = format!("file '{}'\n", path.display());
        list_file.write_all(line.as_bytes())?;
    }
    list_file.flush()?;

    debug!(count = paths.len(), out = %out.display(), "concatenating section videos (stream copy)");
    if run_concat(list_file.path(), out, true).await.is_ok() {
        return Ok(());
    }

    warn!("stream-copy concat failed, falling back to re-encode");
    run_concat(list_file.path(), out, false).await
}

async fn run_concat(list_path: &Path, out: &Path, stream_copy: bool) -> MediaResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"]).arg(list_path);
    if stream_copy {
        cmd.args(["-c", "copy"]);
    } else {
        cmd.args(["-c:v", "libx264", "-c:a", "aac"]);
    }
    cmd.arg(out);
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = cmd.spawn()?;
    let result = tokio::time::timeout(CONCAT_TIMEOUT, child.wait_with_output()).await;
    let output = match result {
        Ok(res) => res?,
        Err(_) => return Err(MediaError::Timeout(CONCAT_TIMEOUT.as_secs())),
    };

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "video concat failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_input_list() {
        let err = concat_videos(&[], Path::new("/tmp/final_video.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::Internal(_)));
    }
}
