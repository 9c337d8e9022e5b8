//! FeedbackIngestor (spec.md §4.11): normalizes the three feedback payload
//! shapes into `RetentionFeedback` and persists a bounded history onto the
//! job's analysis blob.
//!
//! Grounded on `vclip-worker/src/credits.rs`'s normalize-and-persist shape:
//! validate an external payload, fold it into a bounded record, write it
//! back through the job store.

use serde::{Deserialize, Serialize};
use serde_json::json;

use vclip_firestore::JobStore;
use vclip_models::{push_feedback_bounded, CreatorCorrection, JobId, RetentionFeedback};

use crate::error::WorkerResult;

/// The three payload shapes spec.md §4.11 names, as they arrive from the
/// external surface. Exactly one variant is populated per submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackPayload {
    /// Platform analytics pulled from the hosting platform's reporting API.
    PlatformAnalytics {
        watch_percent: Option<f64>,
        hook_hold_percent: Option<f64>,
        completion_percent: Option<f64>,
        rewatch_rate: Option<f64>,
        ctr: Option<f64>,
        shares_per_view: Option<f64>,
        likes_per_view: Option<f64>,
        comments_per_view: Option<f64>,
    },
    /// A manual score entered directly (0-100).
    ManualScore { manual_score: f64 },
    /// A creator-correction category mapped to synthetic metrics via a
    /// fixed table (`RetentionFeedback::from_creator_correction`).
    CreatorCorrection { correction: CreatorCorrection },
}

impl FeedbackPayload {
    fn into_feedback(self) -> RetentionFeedback {
        match self {
            FeedbackPayload::PlatformAnalytics {
                watch_percent,
                hook_hold_percent,
                completion_percent,
                rewatch_rate,
                ctr,
                shares_per_view,
                likes_per_view,
                comments_per_view,
            } => RetentionFeedback {
                watch_percent,
                hook_hold_percent,
                completion_percent,
                rewatch_rate,
                ctr,
                shares_per_view,
                likes_per_view,
                comments_per_view,
                manual_score: None,
                creator_correction: None,
                recorded_at: chrono::Utc::now(),
            }
            .normalized(),
            FeedbackPayload::ManualScore { manual_score } => RetentionFeedback {
                watch_percent: None,
                hook_hold_percent: None,
                completion_percent: None,
                rewatch_rate: None,
                ctr: None,
                shares_per_view: None,
                likes_per_view: None,
                comments_per_view: None,
                manual_score: Some(manual_score),
                creator_correction: None,
                recorded_at: chrono::Utc::now(),
            }
            .normalized(),
            FeedbackPayload::CreatorCorrection { correction } => {
                RetentionFeedback::from_creator_correction(correction)
            }
        }
    }
}

/// Normalizes and persists feedback against a completed job's analysis.
pub struct FeedbackIngestor<'a> {
    job_store: &'a JobStore,
}

impl<'a> FeedbackIngestor<'a> {
    pub fn new(job_store: &'a JobStore) -> Self {
        Self { job_store }
    }

    /// Ingest one feedback submission: normalize the payload, append to the
    /// bounded `feedback_history` entry on `Job.analysis` (capped at
    /// `FEEDBACK_HISTORY_MAX_ENTRIES` via `push_feedback_bounded`), and
    /// persist through an optimistic-concurrency `JobStore::update`.
    pub async fn ingest(&self, job_id: &JobId, payload: FeedbackPayload) -> WorkerResult<()> {
        let feedback = payload.into_feedback();

        self.job_store
            .update(job_id, None, move |job| {
                let mut history = read_history(job);
                push_feedback_bounded(&mut history, feedback.clone());
                let serialized = serde_json::to_value(&history).unwrap_or_else(|_| json!([]));
                job.analysis.insert("feedback_history".to_string(), serialized);
            })
            .await?;

        Ok(())
    }
}

fn read_history(job: &vclip_models::Job) -> Vec<RetentionFeedback> {
    job.analysis
        .get("feedback_history")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_score_normalizes_into_zero_to_hundred_range() {
        let feedback = FeedbackPayload::ManualScore { manual_score: 150.0 }.into_feedback();
        assert_eq!(feedback.manual_score, Some(100.0));
    }

    #[test]
    fn platform_analytics_clamps_fractions_to_unit_range() {
        let feedback = FeedbackPayload::PlatformAnalytics {
            watch_percent: Some(1.4),
            hook_hold_percent: Some(-0.2),
            completion_percent: None,
            rewatch_rate: None,
            ctr: None,
            shares_per_view: None,
            likes_per_view: None,
            comments_per_view: None,
        }
        .into_feedback();
        assert_eq!(feedback.watch_percent, Some(1.0));
        assert_eq!(feedback.hook_hold_percent, Some(0.0));
    }

    #[test]
    fn creator_correction_bad_hook_maps_to_low_synthetic_metrics() {
        let feedback = FeedbackPayload::CreatorCorrection {
            correction: CreatorCorrection::BadHook,
        }
        .into_feedback();
        assert!(feedback.hook_hold_percent.unwrap() < 0.3);
        assert_eq!(feedback.creator_correction, Some(CreatorCorrection::BadHook));
    }
}
