//! Tunable constants shared across the pipeline.
//!
//! Every constant here has a matching environment-variable override wired up
//! in the crate that consumes it (`vclip-worker::config`, `vclip-media`,
//! `vclip-queue::scheduler`); this module only carries the compiled-in
//! defaults and the hard numeric bounds that are never configurable.

/// Hook duration bounds, in seconds.
pub const HOOK_MIN_SECONDS: f64 = 5.0;
pub const HOOK_MAX_SECONDS: f64 = 10.0;

/// Candidate hook durations tried during hook search.
pub const HOOK_CANDIDATE_DURATIONS: &[f64] = &[5.0, 6.0, 7.0, 8.0];

/// Horizon (seconds) beyond which signal extraction is not attempted.
pub const HOOK_ANALYZE_MAX_SECONDS: f64 = 1800.0;

/// Minimum silence gap worth trimming, and padding kept around a cut.
pub const SILENCE_MIN_SECONDS: f64 = 0.8;
pub const SILENCE_PADDING_SECONDS: f64 = 0.12;

/// Minimum coalesced boring-range length eligible for removal.
pub const CUT_MIN_SECONDS: f64 = 3.0;

/// Maximum fraction of any single run that boring-removal may cut.
pub const MAX_CUT_RATIO: f64 = 0.68;
pub const MAX_CUT_RATIO_AGGRESSIVE: f64 = 0.74;

/// Pacing segmentation bounds, in seconds.
pub const PACE_MIN_SECONDS: f64 = 1.2;
pub const PACE_MAX_SECONDS: f64 = 9.0;

/// Segment field bounds (Segment invariant, spec.md §8 invariant 1).
pub const SEGMENT_SPEED_MIN: f64 = 0.25;
pub const SEGMENT_SPEED_MAX: f64 = 4.0;
pub const SEGMENT_ZOOM_MIN: f64 = 0.0;
pub const SEGMENT_ZOOM_MAX: f64 = 0.15;
pub const SEGMENT_BRIGHTNESS_MIN: f64 = -0.45;
pub const SEGMENT_BRIGHTNESS_MAX: f64 = 0.45;
pub const SEGMENT_AUDIO_GAIN_MIN: f64 = 0.8;
pub const SEGMENT_AUDIO_GAIN_MAX: f64 = 1.24;

/// atempo filter chain must keep each stage within ffmpeg's supported range.
pub const ATEMPO_STAGE_MIN: f64 = 0.5;
pub const ATEMPO_STAGE_MAX: f64 = 2.0;

/// Long-form classification and context-floor requirements.
pub const LONG_FORM_RUNTIME_THRESHOLD_SECONDS: f64 = 95.0;
pub const LONG_FORM_CONTEXT_WINDOW_SECONDS: f64 = 18.0;
pub const LONG_FORM_MIN_CONTEXT_SECONDS: f64 = 2.2;

/// Render graph limits.
pub const MAX_RENDER_SEGMENTS: usize = 180;
pub const FILTER_COMPLEX_SCRIPT_THRESHOLD: usize = 16_000;
pub const MAX_VERTICAL_CLIPS: usize = 3;

/// Analysis / frame extraction defaults.
pub const ANALYSIS_FRAME_FPS_DEFAULT: f64 = 2.0;
pub const ANALYSIS_FRAME_SCALE_WIDTH_DEFAULT: u32 = 360;

/// Quality-gate retry bounds (spec.md §8 invariant 7).
pub const MAX_QUALITY_GATE_RETRIES: u32 = 3;
pub const MAX_QUALITY_GATE_ATTEMPTS: u32 = MAX_QUALITY_GATE_RETRIES + 1;

/// Rescue-mode force-render minimums.
pub const RESCUE_MIN_RETENTION: f64 = 44.0;
pub const RESCUE_MIN_HOOK: f64 = 52.0;
pub const RESCUE_MIN_PACING: f64 = 50.0;

/// Scheduler defaults.
pub const QUEUE_RECOVERY_INTERVAL_MS_DEFAULT: u64 = 30_000;
pub const STALE_PIPELINE_MS_DEFAULT: u64 = 5_400_000;
pub const QUEUE_ETA_DEFAULT_SECONDS: u64 = 210;
pub const QUEUE_ETA_MIN_SECONDS: u64 = 20;
pub const QUEUE_ETA_MAX_SECONDS: u64 = 10_800;
pub const SCHEDULER_ETA_WINDOW_SIZE: usize = 25;

/// Calibration lookback.
pub const HOOK_CALIBRATION_LOOKBACK_JOBS_DEFAULT: usize = 24;
pub const CALIBRATION_MIN_SAMPLES: usize = 3;

/// Feedback history bound (per job, most-recent entries kept).
pub const FEEDBACK_HISTORY_MAX_ENTRIES: usize = 40;

/// Hook selection wait loop.
pub const HOOK_SELECTION_WAIT_MS_DEFAULT: u64 = 45_000;
pub const HOOK_SELECTION_POLL_MS_DEFAULT: u64 = 1_500;
pub const HOOK_SELECTION_MATCH_START_TOLERANCE_SEC: f64 = 0.75;
pub const HOOK_SELECTION_MATCH_DURATION_TOLERANCE_SEC: f64 = 0.75;
pub const HOOK_SELECTION_TOP_K: usize = 5;

/// Object storage retry policy.
pub const STORAGE_RETRY_ATTEMPTS: u32 = 3;
pub const STORAGE_RETRY_BASE_DELAY_MS: u64 = 350;

/// stderr tail length kept on persisted failures.
pub const STDERR_TAIL_MAX_CHARS: usize = 3_500;
pub const STDERR_CAPTURE_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Render graph transition/audio constants.
pub const XFADE_DURATION_SECONDS: f64 = 0.08;
pub const JUMP_CUT_FADE_SECONDS: f64 = 0.012;
pub const SEGMENT_AUDIO_FADE_SECONDS: f64 = 0.04;
pub const SOUND_FX_LEVEL_THRESHOLD: f64 = 0.16;
pub const LOUDNESS_TARGET_LUFS_MIN: f64 = -14.6;
pub const LOUDNESS_TARGET_LUFS_MAX: f64 = -13.4;

/// Face-presence/scene-change signal thresholds.
pub const SCENE_CHANGE_THRESHOLD: f64 = 0.45;
pub const AUDIO_RMS_DB_FLOOR: f64 = -60.0;
pub const AUDIO_RMS_DB_CEIL: f64 = 0.0;
