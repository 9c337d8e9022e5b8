//! Worker configuration: the environment-driven knobs from spec.md §6 plus
//! the generic job/shutdown timing the executor needs.

use std::time::Duration;

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// FFmpeg encoder knobs (spec.md §6 `FFMPEG_*`).
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub filter_threads: usize,
    pub preset: String,
    pub crf: u32,
    pub audio_bitrate: String,
    pub audio_sample_rate: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            filter_threads: 1,
            preset: "veryfast".to_string(),
            crf: 23,
            audio_bitrate: "128k".to_string(),
            audio_sample_rate: 48_000,
        }
    }
}

impl EncoderConfig {
    pub fn from_env() -> Self {
        Self {
            filter_threads: env_usize("FFMPEG_FILTER_THREADS", 1),
            preset: env_string("FFMPEG_PRESET", "veryfast"),
            crf: env_usize("FFMPEG_CRF", 23) as u32,
            audio_bitrate: env_string("FFMPEG_AUDIO_BITRATE", "128k"),
            audio_sample_rate: env_usize("FFMPEG_AUDIO_SAMPLE_RATE", 48_000) as u32,
        }
    }
}

/// Analysis-sidecar config (spec.md §6 `ANALYSIS_*`/`WHISPER_*`/`TEXT_DENSITY_*`/`EMOTION_MODEL_BIN`).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub frame_fps: f64,
    pub frame_scale_width: u32,
    pub disable_face_detection: bool,
    pub disable_text_density: bool,
    pub disable_emotion_model: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_fps: 2.0,
            frame_scale_width: 360,
            disable_face_detection: false,
            disable_text_density: false,
            disable_emotion_model: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        Self {
            frame_fps: env_f64("ANALYSIS_FRAME_FPS", 2.0),
            frame_scale_width: env_usize("ANALYSIS_FRAME_SCALE_WIDTH", 360) as u32,
            disable_face_detection: env_bool("ANALYSIS_DISABLE_FACE_DETECTION", false),
            disable_text_density: env_bool("ANALYSIS_DISABLE_TEXT_DENSITY", false),
            disable_emotion_model: env_bool("ANALYSIS_DISABLE_EMOTION_MODEL", false),
        }
    }
}

/// Worker/pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Overrides `Scheduler::MAX_PIPELINES` when set (`JOB_CONCURRENCY`).
    pub job_concurrency: Option<usize>,
    /// Graceful shutdown timeout.
    pub shutdown_timeout: Duration,
    /// Scratch directory root; each job gets `<work_dir>/<job_id>/`.
    pub work_dir: String,
    /// Recovery sweep period (`JOB_QUEUE_RECOVERY_INTERVAL_MS`).
    pub queue_recovery_interval: Duration,
    /// Stale-pipeline reset threshold (`STALE_PIPELINE_MS`).
    pub stale_pipeline: Duration,
    /// Samples considered for hook calibration (`HOOK_CALIBRATION_LOOKBACK_JOBS`).
    pub hook_calibration_lookback_jobs: usize,
    /// Max segments per render (`MAX_RENDER_SEGMENTS`).
    pub max_render_segments: usize,
    /// Watermark asset path override (`WATERMARK_IMAGE_PATH`).
    pub watermark_image_path: Option<String>,
    pub encoder: EncoderConfig,
    pub analysis: AnalysisConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_concurrency: None,
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/vclip".to_string(),
            queue_recovery_interval: Duration::from_millis(30_000),
            stale_pipeline: Duration::from_millis(5_400_000),
            hook_calibration_lookback_jobs: 24,
            max_render_segments: 180,
            watermark_image_path: None,
            encoder: EncoderConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            job_concurrency: std::env::var("JOB_CONCURRENCY").ok().and_then(|s| s.parse().ok()),
            shutdown_timeout: Duration::from_secs(env_u64("WORKER_SHUTDOWN_TIMEOUT", 30)),
            work_dir: env_string("WORKER_WORK_DIR", "/tmp/vclip"),
            queue_recovery_interval: Duration::from_millis(env_u64(
                "JOB_QUEUE_RECOVERY_INTERVAL_MS",
                30_000,
            )),
            stale_pipeline: Duration::from_millis(env_u64("STALE_PIPELINE_MS", 5_400_000)),
            hook_calibration_lookback_jobs: env_usize("HOOK_CALIBRATION_LOOKBACK_JOBS", 24),
            max_render_segments: env_usize("MAX_RENDER_SEGMENTS", 180),
            watermark_image_path: std::env::var("WATERMARK_IMAGE_PATH").ok(),
            encoder: EncoderConfig::from_env(),
            analysis: AnalysisConfig::from_env(),
        }
    }

    pub fn scratch_dir(&self, job_id: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join(job_id)
    }
}
