//! Per-step pipeline state (spec.md §3 "PipelineStepState").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// The nine pipeline steps, in the order the Scheduler runs them
/// (spec.md §2 control flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepName {
    Transcribe,
    FrameAnalysis,
    BestMomentScoring,
    HookSelectAndAudit,
    TimelineReorder,
    PacingAndInterrupts,
    StoryQualityGate,
    RenderFinal,
    RetentionScore,
}

impl StepName {
    pub const ORDER: [StepName; 9] = [
        StepName::Transcribe,
        StepName::FrameAnalysis,
        StepName::BestMomentScoring,
        StepName::HookSelectAndAudit,
        StepName::TimelineReorder,
        StepName::PacingAndInterrupts,
        StepName::StoryQualityGate,
        StepName::RenderFinal,
        StepName::RetentionScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Transcribe => "TRANSCRIBE",
            StepName::FrameAnalysis => "FRAME_ANALYSIS",
            StepName::BestMomentScoring => "BEST_MOMENT_SCORING",
            StepName::HookSelectAndAudit => "HOOK_SELECT_AND_AUDIT",
            StepName::TimelineReorder => "TIMELINE_REORDER",
            StepName::PacingAndInterrupts => "PACING_AND_INTERRUPTS",
            StepName::StoryQualityGate => "STORY_QUALITY_GATE",
            StepName::RenderFinal => "RENDER_FINAL",
            StepName::RetentionScore => "RETENTION_SCORE",
        }
    }

    /// Resolve legacy aliases kept for back-compat reads of older persisted
    /// analysis blobs (spec.md §3 "plus legacy aliases preserved for
    /// back-compat reads").
    pub fn from_legacy_alias(name: &str) -> Option<StepName> {
        match name {
            "SCENE_DETECTION" => Some(StepName::FrameAnalysis),
            "MOMENT_SCORING" => Some(StepName::BestMomentScoring),
            "HOOK_SELECTION" => Some(StepName::HookSelectAndAudit),
            "REORDER" => Some(StepName::TimelineReorder),
            "PACING" => Some(StepName::PacingAndInterrupts),
            "QUALITY_GATE" => Some(StepName::StoryQualityGate),
            "RENDER" => Some(StepName::RenderFinal),
            "RETENTION" => Some(StepName::RetentionScore),
            other => StepName::ORDER.iter().find(|s| s.as_str() == other).copied(),
        }
    }

    pub fn next(&self) -> Option<StepName> {
        let idx = StepName::ORDER.iter().position(|s| s == self)?;
        StepName::ORDER.get(idx + 1).copied()
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single `(Job, StepName)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// One per `(Job, StepName)` (spec.md §3 "PipelineStepState").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineStepState {
    pub step: StepName,
    pub status: StepStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub meta: HashMap<String, JsonValue>,
}

impl PipelineStepState {
    pub fn pending(step: StepName) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            attempts: 0,
            retries: 0,
            started_at: None,
            completed_at: None,
            last_error: None,
            meta: HashMap::new(),
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.attempts += 1;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = StepStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.last_error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.last_error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn retry(&mut self) {
        self.retries += 1;
        self.status = StepStatus::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_order_starts_with_transcribe_ends_with_retention() {
        assert_eq!(StepName::ORDER[0], StepName::Transcribe);
        assert_eq!(StepName::ORDER[8], StepName::RetentionScore);
    }

    #[test]
    fn legacy_alias_resolves() {
        assert_eq!(
            StepName::from_legacy_alias("SCENE_DETECTION"),
            Some(StepName::FrameAnalysis)
        );
        assert_eq!(
            StepName::from_legacy_alias("RENDER_FINAL"),
            Some(StepName::RenderFinal)
        );
        assert_eq!(StepName::from_legacy_alias("NOT_A_STEP"), None);
    }

    #[test]
    fn step_state_lifecycle() {
        let mut state = PipelineStepState::pending(StepName::HookSelectAndAudit);
        state.start();
        assert_eq!(state.status, StepStatus::Running);
        assert_eq!(state.attempts, 1);
        state.fail("boom");
        assert_eq!(state.status, StepStatus::Failed);
        state.retry();
        assert_eq!(state.retries, 1);
        assert_eq!(state.status, StepStatus::Pending);
    }
}
