//! Shared domain types for the retention-editing pipeline: jobs, pipeline
//! step state, engagement windows, segments, hooks, transcripts, judge
//! reports, edit plans, render configuration, style profiles, and feedback.

pub mod constants;
pub mod edit_plan;
pub mod encoding;
pub mod engagement;
pub mod feedback;
pub mod hook;
pub mod job;
pub mod judge;
pub mod pipeline_step;
pub mod rect;
pub mod render_config;
pub mod segment;
pub mod style;
pub mod timestamp;
pub mod transcript;

pub use edit_plan::{CompressedRange, EditPlan, RemovalReason, RemovedRange};
pub use engagement::{clamp01, EngagementWindow};
pub use feedback::{
    push_feedback_bounded, CalibrationProfile, CreatorCorrection, RetentionFeedback,
};
pub use hook::HookCandidate;
pub use job::{Job, JobId, JobStatus, JobSummary, PriorityLevel};
pub use judge::{AppliedThresholds, GateMode, RequiredFixes, RetentionJudgeReport};
pub use pipeline_step::{PipelineStepState, StepName, StepStatus};
pub use rect::NormalizedRect;
pub use render_config::{
    AggressionLevel, FitMode, HorizontalModeOutput, QualityPreset, RenderConfig, RenderMode,
    VerticalLayoutMode,
};
pub use segment::{prepare_segments_for_render, Segment, TransitionStyle};
pub use style::{
    ContentStyleKind, ContentStyleProfile, PacingProfile, RuntimeStyleProfile,
    StyleArchetypeBlend, VideoNicheKind, VideoNicheProfile,
};
pub use transcript::TranscriptCue;
