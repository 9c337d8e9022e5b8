//! Hook selection confidence/threshold and the user-preferred-hook wait
//! loop (spec.md §4.12).
//!
//! Grounded on the polling-loop idiom spec.md §9 mandates for user-hook
//! waiting ("a polling loop with a deadline; do not introduce callbacks"),
//! structured the way `vclip-queue/src/scheduler.rs`'s recovery sweep
//! polls on an interval.

use std::time::Duration;

use vclip_firestore::JobStore;
use vclip_models::constants::{
    HOOK_SELECTION_MATCH_DURATION_TOLERANCE_SEC, HOOK_SELECTION_MATCH_START_TOLERANCE_SEC,
    HOOK_SELECTION_POLL_MS_DEFAULT, HOOK_SELECTION_TOP_K, HOOK_SELECTION_WAIT_MS_DEFAULT,
};
use vclip_models::{AggressionLevel, HookCandidate, JobId};

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::judge::SignalStrength;

/// `0.7*score + 0.3*auditScore` per spec.md §4.12.
pub fn hook_confidence(candidate: &HookCandidate) -> f64 {
    0.7 * candidate.score + 0.3 * candidate.audit_score.unwrap_or(0.0)
}

/// The minimum confidence a candidate must clear to be selected without a
/// user override, after the transcript/signal-strength offsets.
pub fn selection_threshold(aggression: AggressionLevel, has_transcript: bool, signal_strength: SignalStrength) -> f64 {
    let mut threshold = aggression.hook_selection_base_threshold();
    if !has_transcript {
        threshold -= 0.11;
    }
    threshold -= match signal_strength {
        SignalStrength::Weak => 0.08,
        SignalStrength::Medium => 0.05,
        SignalStrength::Strong => 0.0,
    };
    threshold.max(0.0)
}

/// Top-K candidates surfaced to the user for manual override, ranked by
/// confidence descending.
pub fn top_candidates(candidates: &[HookCandidate]) -> Vec<&HookCandidate> {
    let mut ranked: Vec<&HookCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| hook_confidence(b).partial_cmp(&hook_confidence(a)).unwrap());
    ranked.truncate(HOOK_SELECTION_TOP_K);
    ranked
}

/// True if `preferred` falls within tolerance of `candidate`'s start/duration
/// (spec.md §4.12: "within ±HOOK_SELECTION_MATCH_START_TOLERANCE_SEC and
/// ±..._DURATION_TOLERANCE_SEC").
pub fn matches_candidate(candidate: &HookCandidate, preferred_start: f64, preferred_duration: f64) -> bool {
    (candidate.start - preferred_start).abs() <= HOOK_SELECTION_MATCH_START_TOLERANCE_SEC
        && (candidate.duration - preferred_duration).abs() <= HOOK_SELECTION_MATCH_DURATION_TOLERANCE_SEC
}

/// Result of waiting for a user hook pick: either the engine's own choice
/// stands, or a matching user-preferred candidate replaces it.
pub enum HookSelectionOutcome {
    EngineChoice,
    UserOverride(HookCandidate),
}

/// Poll `JobStore` for a user-preferred hook pick for up to
/// `HOOK_SELECTION_WAIT_MS_DEFAULT`, checking every
/// `HOOK_SELECTION_POLL_MS_DEFAULT`. The job's analysis carries a
/// `preferred_hook: {start, duration}` key once a user submits a pick; a
/// `hook_stage_locked` flag (set once `HookSelectAndAudit` completes)
/// rejects late submissions upstream with `hook_stage_complete`.
pub async fn wait_for_user_hook_pick(
    job_store: &JobStore,
    job_id: &JobId,
    candidates: &[HookCandidate],
) -> WorkerResult<HookSelectionOutcome> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(HOOK_SELECTION_WAIT_MS_DEFAULT);
    let poll_interval = Duration::from_millis(HOOK_SELECTION_POLL_MS_DEFAULT);

    loop {
        let job = job_store.get(job_id).await?;
        if let Some(job) = job {
            if let Some(preferred) = job.analysis.get("preferred_hook") {
                let start = preferred.get("start").and_then(|v| v.as_f64());
                let duration = preferred.get("duration").and_then(|v| v.as_f64());
                if let (Some(start), Some(duration)) = (start, duration) {
                    let matched = candidates.iter().find(|c| matches_candidate(c, start, duration));
                    match matched {
                        Some(candidate) => return Ok(HookSelectionOutcome::UserOverride(candidate.clone())),
                        None => return Err(WorkerError::InvalidPreferredHook),
                    }
                }
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Ok(HookSelectionOutcome::EngineChoice);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Mark the hook stage complete on the job's analysis so any further
/// `preferred_hook` submission is rejected with `hook_stage_complete`
/// upstream (spec.md §4.12).
pub async fn lock_hook_stage(job_store: &JobStore, job_id: &JobId) -> WorkerResult<()> {
    job_store
        .update(job_id, None, |job| {
            job.analysis
                .insert("hook_stage_locked".to_string(), serde_json::json!(true));
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(start: f64, duration: f64, score: f64, audit: f64) -> HookCandidate {
        let mut c = HookCandidate::new(start, duration, score);
        c.mark_audited(audit, audit >= 0.5, None);
        c
    }

    #[test]
    fn confidence_blends_score_and_audit() {
        let c = candidate(0.0, 6.0, 1.0, 0.0);
        assert!((hook_confidence(&c) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn selection_threshold_drops_without_transcript() {
        let with = selection_threshold(AggressionLevel::Medium, true, SignalStrength::Strong);
        let without = selection_threshold(AggressionLevel::Medium, false, SignalStrength::Strong);
        assert!(without < with);
        assert!((with - without - 0.11).abs() < 1e-9);
    }

    #[test]
    fn top_candidates_caps_at_top_k() {
        let candidates: Vec<HookCandidate> = (0..10).map(|i| candidate(i as f64, 6.0, 0.5, 0.5)).collect();
        assert_eq!(top_candidates(&candidates).len(), HOOK_SELECTION_TOP_K);
    }

    #[test]
    fn matches_candidate_respects_tolerance() {
        let c = candidate(10.0, 6.0, 0.5, 0.5);
        assert!(matches_candidate(&c, 10.5, 6.5));
        assert!(!matches_candidate(&c, 12.0, 6.0));
    }
}
