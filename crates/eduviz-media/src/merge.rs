//! A/V merge (spec §6 FFmpeg template 3, P6): the per-section merge
//! policy used by the Section Processor. Video is padded to match a
//! longer audio track; when video is the longer stream its length wins
//! outright — nothing is trimmed, and audio is never synthesized or
//! looped to fill a gap.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe;

/// Durations within this tolerance merge directly with no retiming.
const DIRECT_MERGE_TOLERANCE_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeStrategy {
    /// Streams already match within tolerance.
    Direct,
    /// Video was shorter; padded by `delta` seconds to match audio.
    PadVideo { delta: f64 },
    /// Video was longer; audio does not grow, final length is the video's.
    KeepVideoLength,
}

pub struct MergeOutcome {
    pub path: std::path::PathBuf,
    pub duration: f64,
    pub strategy: MergeStrategy,
}

/// Merges `video_path` and `audio_path` into `out` using the no-cut
/// policy (spec §6 template 3 / P6): never trims video against audio.
pub async fn merge_no_cut(video_path: &Path, audio_path: &Path, out: &Path) -> MediaResult<MergeOutcome> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let video_info = probe::probe_video(video_path).await?;
    let audio_duration = probe::get_duration(audio_path).await?;
    let delta = audio_duration - video_info.duration;

    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let strategy = if delta.abs() <= DIRECT_MERGE_TOLERANCE_SECS {
        MergeStrategy::Direct
    } else if delta > 0.0 {
        MergeStrategy::PadVideo { delta }
    } else {
        MergeStrategy::KeepVideoLength
    };

    debug!(?strategy, video_duration = video_info.duration, audio_duration, "merging section audio/video");

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");

    match strategy {
        MergeStrategy::Direct => {
            cmd.args(["-i"]).arg(video_path).args(["-i"]).arg(audio_path).args([
                "-c:v", "copy", "-c:a", "aac", "-shortest",
            ]);
        }
        MergeStrategy::PadVideo { delta } => {
            cmd.args(["-i"])
                .arg(video_path)
                .args(["-i"])
                .arg(audio_path)
                .args(["-filter_complex", &format!("[0:v]tpad=stop_duration={delta:.3}:stop_mode=clone[v]")])
                .args(["-map", "[v]", "-map", "1:a", "-c:v", "libx264", "-c:a", "aac"]);
        }
        MergeStrategy::KeepVideoLength => {
            // Video is longer: keep its full length, audio stream is shorter and not
            // padded or looped (spec §9: "audio is never synthesized to fill gaps").
            cmd.args(["-i"]).arg(video_path).args(["-i"]).arg(audio_path).args([
                "-c:v", "copy", "-c:a", "aac",
            ]);
        }
    }

    let output = cmd
        .arg(out)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "A/V merge failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    let merged_duration = probe::get_duration(out).await?;
    Ok(MergeOutcome { path: out.to_path_buf(), duration: merged_duration, strategy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_thresholds_match_spec_tolerance() {
        assert_eq!(classify_for_test(0.05), MergeStrategy::Direct);
        assert_eq!(classify_for_test(2.0), MergeStrategy::PadVideo { delta: 2.0 });
        assert_eq!(classify_for_test(-3.0), MergeStrategy::KeepVideoLength);
    }

    fn classify_for_test(delta: f64) -> MergeStrategy {
        if delta.abs() <= DIRECT_MERGE_TOLERANCE_SECS {
            MergeStrategy::Direct
        } else if delta > 0.0 {
            MergeStrategy::PadVideo { delta }
        } else {
            MergeStrategy::KeepVideoLength
        }
    }
}
