//! Retention feedback ingestion and per-user calibration (spec.md §4.11).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::FEEDBACK_HISTORY_MAX_ENTRIES;

/// Creator-correction categories mapped to synthetic metrics via a fixed
/// table (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreatorCorrection {
    BadHook,
    TooFast,
    TooGeneric,
    GreatEdit,
}

/// A single normalized feedback entry, clamped per spec.md §4.11 ("All
/// metrics are clamped to [0,1]; manualScore to [0,100]").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetentionFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_hold_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewatch_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_per_view: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes_per_view: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_per_view: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_correction: Option<CreatorCorrection>,
    pub recorded_at: DateTime<Utc>,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

impl RetentionFeedback {
    /// Clamp every populated metric into its declared range
    /// (spec.md §4.11).
    pub fn normalized(mut self) -> Self {
        self.watch_percent = self.watch_percent.map(clamp01);
        self.hook_hold_percent = self.hook_hold_percent.map(clamp01);
        self.completion_percent = self.completion_percent.map(clamp01);
        self.rewatch_rate = self.rewatch_rate.map(clamp01);
        self.ctr = self.ctr.map(clamp01);
        self.shares_per_view = self.shares_per_view.map(clamp01);
        self.likes_per_view = self.likes_per_view.map(clamp01);
        self.comments_per_view = self.comments_per_view.map(clamp01);
        self.manual_score = self.manual_score.map(|v| v.clamp(0.0, 100.0));
        self
    }

    /// Fixed table mapping a creator-correction category to a synthetic
    /// metric set, applied when no platform analytics are available
    /// (spec.md §4.11).
    pub fn from_creator_correction(correction: CreatorCorrection) -> Self {
        let (hook_hold, completion, manual) = match correction {
            CreatorCorrection::BadHook => (0.15, 0.4, 25.0),
            CreatorCorrection::TooFast => (0.5, 0.35, 35.0),
            CreatorCorrection::TooGeneric => (0.45, 0.4, 30.0),
            CreatorCorrection::GreatEdit => (0.85, 0.9, 90.0),
        };
        Self {
            watch_percent: None,
            hook_hold_percent: Some(hook_hold),
            completion_percent: Some(completion),
            rewatch_rate: None,
            ctr: None,
            shares_per_view: None,
            likes_per_view: None,
            comments_per_view: None,
            manual_score: Some(manual),
            creator_correction: Some(correction),
            recorded_at: Utc::now(),
        }
        .normalized()
    }
}

/// Append `entry` to `history`, keeping only the most recent
/// `FEEDBACK_HISTORY_MAX_ENTRIES` (spec.md §4.11).
pub fn push_feedback_bounded(history: &mut Vec<RetentionFeedback>, entry: RetentionFeedback) {
    history.push(entry);
    if history.len() > FEEDBACK_HISTORY_MAX_ENTRIES {
        let drop = history.len() - FEEDBACK_HISTORY_MAX_ENTRIES;
        history.drain(0..drop);
    }
}

/// Per-user adaptive weights/biases derived from recent feedback outcomes
/// (spec.md §9 glossary "Calibration profile").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationProfile {
    /// Normalized hook-faceoff weights, 5 components, each clamped to
    /// [0.05, 0.7] (spec.md §4.11).
    pub hook_faceoff_weights: [f64; 5],
    /// Per-strategy bias in points ∈ [-12,12].
    pub strategy_bias: std::collections::HashMap<String, f64>,
    pub dominant_style: Option<String>,
    pub rationale: Vec<String>,
    pub sample_count: usize,
}

impl CalibrationProfile {
    /// The profile returned when fewer than `CALIBRATION_MIN_SAMPLES`
    /// completed jobs exist for the user (spec.md §4.11).
    pub fn default_profile() -> Self {
        Self {
            hook_faceoff_weights: [0.2, 0.2, 0.2, 0.2, 0.2],
            strategy_bias: std::collections::HashMap::new(),
            dominant_style: None,
            rationale: vec!["insufficient history, using default calibration".into()],
            sample_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_correction_great_edit_yields_high_scores() {
        let fb = RetentionFeedback::from_creator_correction(CreatorCorrection::GreatEdit);
        assert_eq!(fb.manual_score, Some(90.0));
        assert!(fb.hook_hold_percent.unwrap() > 0.8);
    }

    #[test]
    fn normalized_clamps_out_of_range_metrics() {
        let fb = RetentionFeedback {
            watch_percent: Some(1.4),
            hook_hold_percent: None,
            completion_percent: None,
            rewatch_rate: None,
            ctr: None,
            shares_per_view: None,
            likes_per_view: None,
            comments_per_view: None,
            manual_score: Some(140.0),
            creator_correction: None,
            recorded_at: Utc::now(),
        }
        .normalized();
        assert_eq!(fb.watch_percent, Some(1.0));
        assert_eq!(fb.manual_score, Some(100.0));
    }

    #[test]
    fn push_feedback_bounded_trims_oldest() {
        let mut history = Vec::new();
        for _ in 0..50 {
            push_feedback_bounded(
                &mut history,
                RetentionFeedback::from_creator_correction(CreatorCorrection::TooFast),
            );
        }
        assert_eq!(history.len(), FEEDBACK_HISTORY_MAX_ENTRIES);
    }

    #[test]
    fn default_profile_has_zero_samples() {
        let profile = CalibrationProfile::default_profile();
        assert_eq!(profile.sample_count, 0);
        assert_eq!(profile.hook_faceoff_weights.iter().sum::<f64>(), 1.0);
    }
}
