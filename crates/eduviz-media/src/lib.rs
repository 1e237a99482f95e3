//! FFmpeg/FFprobe/renderer subprocess adapters (spec §6): the engine's
//! only points of contact with the animation renderer, the audio/video
//! toolchain, and the TTS backend. Everything here treats those tools as
//! opaque external collaborators — this crate never parses Manim output,
//! decodes audio codecs, or interprets video content.

pub mod command;
pub mod concat;
pub mod error;
pub mod fs_utils;
pub mod merge;
pub mod probe;
pub mod progress;
pub mod renderer;
pub mod tts;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::concat_videos;
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use merge::{merge_no_cut, MergeOutcome, MergeStrategy};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use renderer::{clean_scene_media, render_scene, RenderOutcome, RenderQuality, RendererConfig};
pub use tts::{concat_segment_audio, synthesize, synthesize_segments, TtsConfig};
