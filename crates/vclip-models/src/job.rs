//! Job definitions for the retention-editing pipeline.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::render_config::RenderConfig;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status (spec.md §3 "Status enum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Uploading,
    Analyzing,
    Hooking,
    Cutting,
    Pacing,
    Story,
    Subtitling,
    Audio,
    Retention,
    Rendering,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Uploading => "uploading",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Hooking => "hooking",
            JobStatus::Cutting => "cutting",
            JobStatus::Pacing => "pacing",
            JobStatus::Story => "story",
            JobStatus::Subtitling => "subtitling",
            JobStatus::Audio => "audio",
            JobStatus::Retention => "retention",
            JobStatus::Rendering => "rendering",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses a recovery sweep considers "in flight" and therefore
    /// eligible for stale detection / re-enqueue (spec.md §4.2).
    pub fn is_recoverable(&self) -> bool {
        !self.is_terminal()
    }

    /// The fixed adjacency table enforced by `JobStore::update`
    /// (spec.md §4.1). `Failed` is reachable from any non-terminal status
    /// (cancellation, fatal errors); `Completed` is only reachable from
    /// `Rendering` or `Retention`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        if *self == next {
            return true;
        }
        if next == Failed {
            return !self.is_terminal();
        }
        match (*self, next) {
            (Queued, Uploading) => true,
            (Queued, Analyzing) => true,
            (Uploading, Analyzing) => true,
            (Analyzing, Hooking) => true,
            (Hooking, Cutting) => true,
            (Cutting, Pacing) => true,
            (Pacing, Story) => true,
            (Story, Subtitling) => true,
            (Story, Audio) => true,
            (Subtitling, Audio) => true,
            (Audio, Retention) => true,
            (Retention, Rendering) => true,
            (Rendering, Retention) => true,
            (Retention, Completed) => true,
            (Rendering, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling priority. 1 = priority lane, 2 = normal lane (lower drains first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[repr(u8)]
pub enum PriorityLevel {
    Priority = 1,
    Normal = 2,
}

impl Default for PriorityLevel {
    fn default() -> Self {
        PriorityLevel::Normal
    }
}

/// A user's video editing job (spec.md §3 "Job").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub owner_user_id: String,
    pub status: JobStatus,
    /// 0-100, non-decreasing within a run.
    pub progress: u8,
    pub input_object_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_object_key: Option<String>,
    #[serde(default)]
    pub vertical_output_object_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_duration_seconds: Option<f64>,
    pub requested_quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_quality: Option<String>,
    #[serde(default)]
    pub watermark_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_score: Option<f64>,
    #[serde(default)]
    pub optimization_notes: Vec<String>,
    pub render_settings: RenderConfig,
    /// Structured metadata blob (engagement windows, hook candidates,
    /// attempts, calibration snapshots, etc.) — see
    /// `vclip-worker::pipeline::analysis` for the normalized shape.
    #[serde(default)]
    pub analysis: HashMap<String, JsonValue>,
    #[serde(default)]
    pub priority_level: PriorityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        owner_user_id: impl Into<String>,
        input_object_key: impl Into<String>,
        requested_quality: impl Into<String>,
        priority_level: PriorityLevel,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner_user_id: owner_user_id.into(),
            status: JobStatus::Queued,
            progress: 0,
            input_object_key: input_object_key.into(),
            output_object_key: None,
            vertical_output_object_keys: Vec::new(),
            input_duration_seconds: None,
            requested_quality: requested_quality.into(),
            final_quality: None,
            watermark_applied: false,
            retention_score: None,
            optimization_notes: Vec::new(),
            render_settings: RenderConfig::default(),
            analysis: HashMap::new(),
            priority_level,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `outputObjectKey` is set iff status has reached `completed`
    /// (spec.md §3 invariant).
    pub fn invariant_holds(&self) -> bool {
        if self.status == JobStatus::Completed {
            self.output_object_key.is_some()
        } else {
            true
        }
    }
}

/// Cheap projection used by `JobStore::listRecentCompleted` for calibration
/// queries, distinct from the full `Job` document (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSummary {
    pub id: JobId,
    pub owner_user_id: String,
    pub status: JobStatus,
    pub retention_score: Option<f64>,
    pub content_format: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_to_completed_requires_intermediate_steps() {
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Analyzing));
    }

    #[test]
    fn failed_reachable_from_any_nonterminal_status() {
        assert!(JobStatus::Rendering.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Hooking.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Analyzing));
    }

    #[test]
    fn completed_invariant_requires_output_key() {
        let mut job = Job::new("user-1", "uploads/a.mp4", "standard", PriorityLevel::Normal);
        job.status = JobStatus::Completed;
        assert!(!job.invariant_holds());
        job.output_object_key = Some("outputs/a/output.mp4".into());
        assert!(job.invariant_holds());
    }

    #[test]
    fn job_creation_defaults() {
        let job = Job::new("user-1", "uploads/a.mp4", "standard", PriorityLevel::Priority);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.priority_level, PriorityLevel::Priority);
    }
}
