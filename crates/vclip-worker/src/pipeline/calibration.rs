//! CalibrationStore (spec.md §4.11): adaptive hook-faceoff weights and
//! per-strategy bias derived from a user's recent completed jobs.
//!
//! Grounded on `vclip-worker/src/credits.rs`'s normalize-and-persist shape,
//! generalized from a ledger balance to a weighted outcome signal averaged
//! over a bounded job history.

use std::collections::HashMap;

use vclip_firestore::JobStore;
use vclip_models::constants::CALIBRATION_MIN_SAMPLES;
use vclip_models::{CalibrationProfile, ContentStyleKind, JobSummary, RetentionFeedback};

use crate::error::WorkerResult;
use crate::pipeline::retry_orchestrator::Strategy;

/// Over-fetch factor applied to `listRecentCompleted`'s global limit, since
/// the store doesn't expose a per-user query primitive (see job_store.rs's
/// `list_recent_completed`, which sorts and truncates across all owners).
const OVER_FETCH_FACTOR: usize = 12;
const OVER_FETCH_FLOOR: usize = 300;

/// One job's contribution to the calibration average: an outcome signal in
/// [0,1] plus the strategy that produced it and (if recoverable from the
/// job's analysis blob) the content style used.
struct CalibrationSample {
    outcome: f64,
    strategy: Option<String>,
    content_style: Option<String>,
}

/// Computes a `CalibrationProfile` from a user's recent completed-job
/// history. Reads are fresh on every pipeline run per spec.md §5 ("Hook
/// calibration and feedback are per-user, read-mostly; cache invalidation
/// is not required").
pub struct CalibrationStore<'a> {
    job_store: &'a JobStore,
    lookback_jobs: usize,
}

impl<'a> CalibrationStore<'a> {
    pub fn new(job_store: &'a JobStore, lookback_jobs: usize) -> Self {
        Self { job_store, lookback_jobs }
    }

    /// Compute the calibration profile for `owner_user_id`. Falls back to
    /// `CalibrationProfile::default_profile()` when fewer than
    /// `CALIBRATION_MIN_SAMPLES` usable jobs are found.
    pub async fn compute(&self, owner_user_id: &str) -> WorkerResult<CalibrationProfile> {
        let lookback = self.lookback_jobs.max(1);
        let fetch_limit = (lookback * OVER_FETCH_FACTOR).max(OVER_FETCH_FLOOR);

        let all_completed = self.job_store.list_recent_completed(fetch_limit).await?;
        let owned: Vec<JobSummary> = all_completed
            .into_iter()
            .filter(|s| s.owner_user_id == owner_user_id)
            .take(lookback)
            .collect();

        let mut samples = Vec::with_capacity(owned.len());
        for summary in &owned {
            if let Some(sample) = self.sample_for(summary).await {
                samples.push(sample);
            }
        }

        if samples.len() < CALIBRATION_MIN_SAMPLES {
            return Ok(CalibrationProfile::default_profile());
        }

        Ok(build_profile(&samples))
    }

    /// Build one outcome sample for a completed job. Reads `Job.analysis`
    /// for the most recent `RetentionFeedback` entry and the strategy/style
    /// recorded by the retry orchestrator, falling back to the summary's
    /// bare `retention_score` when no richer feedback history exists.
    async fn sample_for(&self, summary: &JobSummary) -> Option<CalibrationSample> {
        let model_retention = summary.retention_score.unwrap_or(0.0) / 100.0;

        let job = self.job_store.get(&summary.id).await.ok().flatten();
        let (feedback_component, strategy, content_style) = match &job {
            Some(job) => {
                let feedback = latest_feedback(job);
                let strategy = job
                    .analysis
                    .get("chosen_strategy")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let content_style = job
                    .analysis
                    .get("dominant_content_style")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                (feedback.map(outcome_signal), strategy, content_style)
            }
            None => (None, None, None),
        };

        let outcome = match feedback_component {
            Some(feedback_signal) => 0.45 * model_retention + 0.55 * feedback_signal,
            None => model_retention,
        };

        Some(CalibrationSample {
            outcome: outcome.clamp(0.0, 1.0),
            strategy,
            content_style,
        })
    }
}

/// Blend the platform/manual/creator-correction signals on a
/// `RetentionFeedback` entry into one outcome scalar in [0,1]. Mirrors the
/// weighting spec.md §4.11 names (watch/hook/completion/manual/composite).
fn outcome_signal(feedback: &RetentionFeedback) -> f64 {
    let mut weighted = 0.0;
    let mut weight_total = 0.0;

    let mut push = |value: Option<f64>, weight: f64, scale: f64| {
        if let Some(v) = value {
            weighted += (v / scale).clamp(0.0, 1.0) * weight;
            weight_total += weight;
        }
    };

    push(feedback.watch_percent, 0.24, 1.0);
    push(feedback.hook_hold_percent, 0.22, 1.0);
    push(feedback.completion_percent, 0.18, 1.0);
    push(feedback.rewatch_rate, 0.08, 1.0);
    push(feedback.ctr, 0.08, 1.0);
    push(feedback.shares_per_view, 0.06, 1.0);
    push(feedback.likes_per_view, 0.06, 1.0);
    push(feedback.comments_per_view, 0.04, 1.0);
    push(feedback.manual_score, 0.04, 100.0);

    if weight_total <= 0.0 {
        0.5
    } else {
        (weighted / weight_total).clamp(0.0, 1.0)
    }
}

fn latest_feedback(job: &vclip_models::Job) -> Option<RetentionFeedback> {
    let raw = job.analysis.get("feedback_history")?;
    let entries: Vec<RetentionFeedback> = serde_json::from_value(raw.clone()).ok()?;
    entries.into_iter().last()
}

/// Derive the five-component hook-faceoff weight vector, per-strategy bias
/// table, dominant style, and rationale from the sample set. Component
/// ordering matches `edit_plan::hooks::weighted_score`: indices 0/2/4 scale
/// `candidate.score`, indices 1/3 scale `candidate.audit_score`.
fn build_profile(samples: &[CalibrationSample]) -> CalibrationProfile {
    let mean_outcome = samples.iter().map(|s| s.outcome).sum::<f64>() / samples.len() as f64;

    // Higher mean outcome -> lean harder on raw engagement score over audit
    // score (the audience is already responding; don't over-filter). Lower
    // mean outcome -> lean on audit score to favor clarity/payoff.
    let score_lean = (0.2 + mean_outcome * 0.3).clamp(0.05, 0.7);
    let audit_lean = (0.5 - mean_outcome * 0.3).clamp(0.05, 0.7);
    let mut weights = [score_lean, audit_lean, score_lean, audit_lean, score_lean];
    normalize_weights(&mut weights);

    let mut strategy_bias: HashMap<String, f64> = HashMap::new();
    for strategy in [
        Strategy::Baseline,
        Strategy::HookFirst,
        Strategy::EmotionFirst,
        Strategy::PacingFirst,
        Strategy::Rescue,
    ] {
        let key = strategy.as_str().to_string();
        let matching: Vec<f64> = samples
            .iter()
            .filter(|s| s.strategy.as_deref() == Some(key.as_str()))
            .map(|s| s.outcome)
            .collect();
        if matching.is_empty() {
            continue;
        }
        let strategy_mean = matching.iter().sum::<f64>() / matching.len() as f64;
        let bias_points = ((strategy_mean - mean_outcome) * 40.0).clamp(-12.0, 12.0);
        strategy_bias.insert(key, bias_points);
    }

    let dominant_style = dominant_content_style(samples);

    let mut rationale = vec![format!(
        "{} sample(s), mean outcome {:.2}",
        samples.len(),
        mean_outcome
    )];
    if mean_outcome >= 0.6 {
        rationale.push("history skews positive; weights favor raw engagement score".to_string());
    } else if mean_outcome <= 0.4 {
        rationale.push("history skews weak; weights favor audit score (clarity/payoff)".to_string());
    }
    if let Some(style) = &dominant_style {
        rationale.push(format!("dominant content style: {style}"));
    }
    for (strategy, bias) in &strategy_bias {
        if bias.abs() >= 2.0 {
            rationale.push(format!("{strategy} bias {bias:+.1} points from mean-centered outcomes"));
        }
    }

    CalibrationProfile {
        hook_faceoff_weights: weights,
        strategy_bias,
        dominant_style,
        rationale,
        sample_count: samples.len(),
    }
}

fn normalize_weights(weights: &mut [f64; 5]) {
    for w in weights.iter_mut() {
        *w = w.clamp(0.05, 0.7);
    }
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights.iter_mut() {
            *w = (*w / sum).clamp(0.05, 0.7);
        }
    }
}

fn dominant_content_style(samples: &[CalibrationSample]) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for sample in samples {
        if let Some(style) = &sample.content_style {
            *counts.entry(style.clone()).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, n)| *n).map(|(style, _)| style)
}

/// Canonical style tags recorded on `Job.analysis.dominant_content_style`,
/// kept in sync with `ContentStyleKind`'s variants for round-trip parsing.
pub fn content_style_tag(kind: ContentStyleKind) -> &'static str {
    match kind {
        ContentStyleKind::Reaction => "reaction",
        ContentStyleKind::Vlog => "vlog",
        ContentStyleKind::Tutorial => "tutorial",
        ContentStyleKind::Gaming => "gaming",
        ContentStyleKind::Story => "story",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(outcome: f64, strategy: &str) -> CalibrationSample {
        CalibrationSample {
            outcome,
            strategy: Some(strategy.to_string()),
            content_style: Some("vlog".to_string()),
        }
    }

    #[test]
    fn weights_stay_within_bounds_and_sum_close_to_one() {
        let samples = vec![sample(0.8, "BASELINE"), sample(0.9, "HOOK_FIRST"), sample(0.7, "BASELINE")];
        let profile = build_profile(&samples);
        for w in profile.hook_faceoff_weights {
            assert!((0.05..=0.7).contains(&w));
        }
        let sum: f64 = profile.hook_faceoff_weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn strategy_bias_is_clamped() {
        let mut samples = vec![sample(1.0, "HOOK_FIRST"); 10];
        samples.extend(vec![sample(0.0, "BASELINE"); 10]);
        let profile = build_profile(&samples);
        for bias in profile.strategy_bias.values() {
            assert!((-12.0..=12.0).contains(bias));
        }
    }

    #[test]
    fn dominant_style_picks_plurality() {
        let samples = vec![sample(0.5, "BASELINE"); 4];
        let profile = build_profile(&samples);
        assert_eq!(profile.dominant_style.as_deref(), Some("vlog"));
    }
}
