//! Pipeline error kinds surfaced on `Job.error` / `PipelineStepState.last_error`.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// The engine's error taxonomy. Every variant's `Display` produces the
/// exact error-kind string persisted on the job or step record, so callers
/// can `.to_string()` it straight into `Job.error`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("ffmpeg_missing")]
    FfmpegMissing,
    #[error("ffprobe_missing")]
    FfprobeMissing,

    #[error("download_failed")]
    DownloadFailed,
    #[error("input_file_missing_after_download")]
    InputFileMissingAfterDownload,
    #[error("input_file_empty_after_download")]
    InputFileEmptyAfterDownload,

    #[error("duration_unavailable")]
    DurationUnavailable,

    #[error("render_failed")]
    RenderFailed,
    #[error("edited_render_failed:{0}")]
    EditedRenderFailed(String),
    #[error("output_file_missing_after_render")]
    OutputFileMissingAfterRender,
    #[error("output_file_empty_after_render")]
    OutputFileEmptyAfterRender,
    #[error("output_upload_missing")]
    OutputUploadMissing,

    #[error("no_renderable_segments")]
    NoRenderableSegments,

    #[error("queue_canceled_by_user")]
    QueueCanceledByUser,

    #[error("FAILED_HOOK: {0}")]
    FailedHook(String),
    #[error("FAILED_QUALITY_GATE: {0}")]
    FailedQualityGate(String),

    #[error("invalid_status_transition:{from}->{to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("job_update_conflict")]
    JobUpdateConflict,
    #[error("invalid_preferred_hook")]
    InvalidPreferredHook,
    #[error("hook_stage_complete")]
    HookStageComplete,
    #[error("hook_candidates_not_ready")]
    HookCandidatesNotReady,
    #[error("hook_update_conflict")]
    HookUpdateConflict,

    #[error("RENDER_LIMIT_REACHED")]
    RenderLimitReached,
    #[error("MINUTES_LIMIT_REACHED")]
    MinutesLimitReached,
    #[error("PLAN_LIMIT_EXCEEDED")]
    PlanLimitExceeded,

    #[error("Storage error: {0}")]
    Storage(#[from] vclip_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] vclip_firestore::FirestoreError),

    #[error("Media error: {0}")]
    Media(#[from] vclip_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vclip_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn edited_render_failed(reason: impl Into<String>) -> Self {
        Self::EditedRenderFailed(reason.into())
    }

    pub fn failed_hook(reason: impl Into<String>) -> Self {
        Self::FailedHook(reason.into())
    }

    pub fn failed_quality_gate(reason: impl Into<String>) -> Self {
        Self::FailedQualityGate(reason.into())
    }

    pub fn invalid_status_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidStatusTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Storage/Firestore hiccups are retried inside their own call sites;
    /// the pipeline never retries a whole job by catching these except via
    /// stale-job recovery re-enqueue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Storage(_) | WorkerError::Firestore(_) | WorkerError::DownloadFailed
        )
    }

    /// Cancellation is reported distinctly so the executor can skip the
    /// upload step and avoid recording it as a render or quality-gate failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, WorkerError::QueueCanceledByUser)
    }
}
