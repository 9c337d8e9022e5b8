#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for video processing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation support via tokio
//! - Signal extraction (audio RMS, scene changes, face presence, frame dumps)
//!   feeding the engagement model
//! - Render graph synthesis and execution (segments, transitions, subtitles,
//!   watermark, audio polish)

pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod render_graph;
pub mod signals;
pub mod silence_removal;
pub mod thumbnail;
pub mod watermark;

pub use command::{create_ffmpeg_command, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use render_graph::{RenderGraph, RenderGraphOptions};
pub use signals::{
    extract_audio_rms, extract_face_presence, extract_frames, extract_scene_changes,
    AudioRmsSample, FacePresenceSample,
};
pub use thumbnail::generate_thumbnail;
pub use watermark::{
    apply_watermark, apply_watermark_if_available, WatermarkConfig, DEFAULT_WATERMARK_PATH,
};
