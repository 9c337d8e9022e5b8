//! RetentionJudge: scores an edit plan across five dimensions and compares
//! them against adaptive thresholds (spec.md §4.7).

use vclip_models::{
    AppliedThresholds, EditPlan, EngagementWindow, GateMode, RequiredFixes, RetentionJudgeReport,
};

/// Signal-strength tier used by `derive_applied_thresholds`'s offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Weak,
    Medium,
    Strong,
}

const BASE_RETENTION: f64 = 58.0;
const BASE_HOOK_STRENGTH: f64 = 55.0;
const BASE_PACING: f64 = 55.0;
const BASE_CLARITY: f64 = 55.0;

/// Per-aggression threshold offset in points, strictest at `Viral`
/// (spec.md §8 invariant 6: "stricter aggression ⇒ thresholds are ≥
/// baseline").
fn aggression_offset(aggression: vclip_models::AggressionLevel) -> f64 {
    use vclip_models::AggressionLevel::*;
    match aggression {
        Low => -4.0,
        Medium => 0.0,
        High => 4.0,
        Viral => 8.0,
    }
}

/// Derive `applied_thresholds` from the base table plus aggression,
/// transcript-availability, signal-strength, format/platform, and feedback
/// offsets, clamped to a published floor/ceiling (spec.md §4.7/§8).
pub fn derive_applied_thresholds(
    aggression: vclip_models::AggressionLevel,
    has_transcript: bool,
    signal_strength: SignalStrength,
    content_format: &str,
    feedback_offset: f64,
) -> AppliedThresholds {
    let agg_offset = aggression_offset(aggression);
    let transcript_offset = if has_transcript { 0.0 } else { -5.0 };
    let signal_offset = match signal_strength {
        SignalStrength::Weak => -6.0,
        SignalStrength::Medium => -3.0,
        SignalStrength::Strong => 0.0,
    };
    // Long-form content is judged against a looser retention floor; this is
    // the one place aggression's monotonicity is allowed to relax.
    let format_offset = if content_format == "podcast_clip" { -6.0 } else { 0.0 };
    let feedback_offset = feedback_offset.clamp(-4.0, 4.0);

    let total = agg_offset + transcript_offset + signal_offset + format_offset + feedback_offset;
    let clamp_one = |base: f64| (base + total).clamp(30.0, 92.0);

    AppliedThresholds {
        retention: clamp_one(BASE_RETENTION),
        hook_strength: clamp_one(BASE_HOOK_STRENGTH),
        pacing: clamp_one(BASE_PACING),
        clarity: clamp_one(BASE_CLARITY),
    }
}

/// Inputs beyond the edit plan itself that the judge's threshold
/// derivation and format-weighted fusion need.
pub struct JudgeInput<'a> {
    pub plan: &'a EditPlan,
    pub captions_enabled: bool,
    pub pattern_interrupt_count: usize,
    pub target_interrupt_count: usize,
    pub content_format: &'a str,
    pub target_platform: &'a str,
    pub strategy_profile: &'a str,
    pub applied_thresholds: AppliedThresholds,
    pub gate_mode: GateMode,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stdev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn format_target_segment_seconds(content_format: &str) -> f64 {
    match content_format {
        "podcast_clip" => 4.8,
        "tiktok_short" => 3.2,
        _ => 4.2,
    }
}

/// The `1 - contextPenalty` proxy used by `clarity_score`: audits store the
/// penalty on `reason`, so derive it from `audit_score`/`audit_passed`
/// directly when no explicit field carries it.
fn context_clarity(plan: &EditPlan) -> f64 {
    if plan.hook.audit_passed {
        0.85
    } else {
        plan.hook.audit_score.unwrap_or(0.5).clamp(0.0, 1.0) * 0.7
    }
}

/// Run `RetentionJudge` over `input.plan`, producing a full
/// `RetentionJudgeReport` with `passed` already computed.
pub fn run_retention_judge(input: JudgeInput<'_>) -> RetentionJudgeReport {
    let windows: &[EngagementWindow] = &input.plan.windows;
    let audio_values: Vec<f64> = windows.iter().map(|w| w.audio_energy).collect();
    let audio_mean = mean(audio_values.iter().copied());
    let audio_stdev = stdev(&audio_values, audio_mean);
    let consistency = if audio_mean > 1e-6 {
        (1.0 - (audio_stdev / audio_mean)).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let avg_segment_len = if input.plan.segments.is_empty() {
        0.0
    } else {
        input.plan.segments.iter().map(|s| s.duration()).sum::<f64>() / input.plan.segments.len() as f64
    };
    let target_len = format_target_segment_seconds(input.content_format);
    let pacing_distance = (1.0 - ((avg_segment_len - target_len).abs() / target_len.max(1.0))).clamp(0.0, 1.0);

    let boredom_ratio = input
        .plan
        .metadata
        .get("boredom_ratio")
        .and_then(|v| v.as_f64())
        .unwrap_or_else(|| mean(windows.iter().map(|w| w.boredom_score)));
    let boredom_removal_ratio = (1.0 - boredom_ratio).clamp(0.0, 1.0);

    let spike_density = if windows.is_empty() {
        0.0
    } else {
        windows.iter().filter(|w| w.emotional_spike).count() as f64 / windows.len() as f64
    };

    let interrupt_coverage = if input.target_interrupt_count == 0 {
        1.0
    } else {
        (input.pattern_interrupt_count as f64 / input.target_interrupt_count as f64).clamp(0.0, 1.5).min(1.0)
    };

    let subtitle_factor = if input.captions_enabled { 1.0 } else { 0.6 };
    let audio_score = mean(windows.iter().map(|w| w.audio_energy));

    let retention_score = 100.0
        * (0.22 * input.plan.hook.score
            + 0.16 * consistency
            + 0.16 * pacing_distance
            + 0.16 * boredom_removal_ratio
            + 0.12 * spike_density
            + 0.1 * interrupt_coverage
            + 0.04 * subtitle_factor
            + 0.04 * audio_score);

    let hook_strength = 100.0 * (0.65 * input.plan.hook.score + 0.35 * input.plan.hook.audit_score.unwrap_or(0.0));
    let pacing_score = 100.0 * (0.7 * pacing_distance + 0.3 * interrupt_coverage);

    let context_penalty_complement = context_clarity(input.plan);
    let clarity_score = 100.0
        * (0.72 * context_penalty_complement
            + 0.14 * subtitle_factor
            + 0.14 * if input.plan.hook.audit_passed { 1.0 } else { 0.6 });

    let emotion_mean = mean(windows.iter().map(|w| w.emotion_intensity));
    let vocal_mean = mean(windows.iter().map(|w| w.vocal_excitement));
    let emotional_pull = 100.0
        * (0.4 * emotion_mean + 0.3 * vocal_mean + 0.2 * spike_density + 0.1 * input.plan.hook.audit_score.unwrap_or(0.0))
            .clamp(0.0, 1.0);

    let mut report = RetentionJudgeReport {
        retention_score: retention_score.clamp(0.0, 100.0),
        hook_strength: hook_strength.clamp(0.0, 100.0),
        pacing_score: pacing_score.clamp(0.0, 100.0),
        clarity_score: clarity_score.clamp(0.0, 100.0),
        emotional_pull,
        content_format: input.content_format.to_string(),
        target_platform: input.target_platform.to_string(),
        strategy_profile: input.strategy_profile.to_string(),
        why_keep_watching: build_why_keep_watching(input.plan, consistency, boredom_removal_ratio),
        what_is_generic: build_what_is_generic(input.plan, consistency),
        required_fixes: RequiredFixes::default(),
        applied_thresholds: input.applied_thresholds,
        gate_mode: input.gate_mode,
        passed: false,
    };

    report.required_fixes = RequiredFixes {
        stronger_hook: report.hook_strength < report.applied_thresholds.hook_strength,
        raise_emotion: report.emotional_pull < 55.0,
        improve_pacing: report.pacing_score < report.applied_thresholds.pacing,
        increase_interrupts: interrupt_coverage < 0.8,
    };

    report.recompute_passed();
    report
}

fn build_why_keep_watching(plan: &EditPlan, consistency: f64, boredom_removal_ratio: f64) -> Vec<String> {
    let mut reasons = Vec::new();
    if plan.hook.audit_passed {
        reasons.push("audited hook clears the curiosity/payoff bar".to_string());
    }
    if consistency > 0.7 {
        reasons.push("stable audio energy across the cut".to_string());
    }
    if boredom_removal_ratio > 0.6 {
        reasons.push("low-signal stretches were trimmed".to_string());
    }
    reasons
}

fn build_what_is_generic(plan: &EditPlan, consistency: f64) -> Vec<String> {
    let mut notes = Vec::new();
    if !plan.hook.audit_passed {
        notes.push("hook did not clear audit; falling back to a synthesized teaser".to_string());
    }
    if consistency < 0.4 {
        notes.push("uneven audio energy across segments".to_string());
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::HookCandidate;

    fn sample_plan(hook_score: f64, audit_passed: bool) -> EditPlan {
        let mut hook = HookCandidate::new(0.0, 6.0, hook_score);
        hook.mark_audited(hook_score, audit_passed, None);
        EditPlan {
            hook,
            segments: vec![vclip_models::Segment::new(0.0, 20.0)],
            removed_ranges: vec![],
            compressed_ranges: vec![],
            windows: (0..20).map(EngagementWindow::empty).collect(),
            candidates: vec![],
            metadata: Default::default(),
        }
    }

    fn thresholds() -> AppliedThresholds {
        AppliedThresholds {
            retention: 60.0,
            hook_strength: 55.0,
            pacing: 55.0,
            clarity: 55.0,
        }
    }

    #[test]
    fn strong_audited_hook_scores_higher_than_weak_unaudited_one() {
        let strong = sample_plan(0.9, true);
        let weak = sample_plan(0.2, false);
        let strong_report = run_retention_judge(JudgeInput {
            plan: &strong,
            captions_enabled: true,
            pattern_interrupt_count: 3,
            target_interrupt_count: 3,
            content_format: "short_form",
            target_platform: "tiktok",
            strategy_profile: "BASELINE",
            applied_thresholds: thresholds(),
            gate_mode: GateMode::Adaptive,
        });
        let weak_report = run_retention_judge(JudgeInput {
            plan: &weak,
            captions_enabled: true,
            pattern_interrupt_count: 3,
            target_interrupt_count: 3,
            content_format: "short_form",
            target_platform: "tiktok",
            strategy_profile: "BASELINE",
            applied_thresholds: thresholds(),
            gate_mode: GateMode::Adaptive,
        });
        assert!(strong_report.hook_strength > weak_report.hook_strength);
    }

    #[test]
    fn passed_requires_all_four_scores_to_clear_thresholds() {
        let plan = sample_plan(0.1, false);
        let report = run_retention_judge(JudgeInput {
            plan: &plan,
            captions_enabled: false,
            pattern_interrupt_count: 0,
            target_interrupt_count: 4,
            content_format: "short_form",
            target_platform: "tiktok",
            strategy_profile: "BASELINE",
            applied_thresholds: thresholds(),
            gate_mode: GateMode::Adaptive,
        });
        assert!(!report.passed);
        assert!(report.required_fixes.any());
    }

    #[test]
    fn stricter_aggression_never_lowers_thresholds() {
        use vclip_models::AggressionLevel;
        let low = derive_applied_thresholds(AggressionLevel::Low, true, SignalStrength::Strong, "short_form", 0.0);
        let viral = derive_applied_thresholds(AggressionLevel::Viral, true, SignalStrength::Strong, "short_form", 0.0);
        assert!(viral.retention >= low.retention);
        assert!(viral.hook_strength >= low.hook_strength);
        assert!(viral.pacing >= low.pacing);
        assert!(viral.clarity >= low.clarity);
    }

    #[test]
    fn long_form_podcast_gets_a_lower_retention_floor() {
        use vclip_models::AggressionLevel;
        let short = derive_applied_thresholds(AggressionLevel::Medium, true, SignalStrength::Strong, "short_form", 0.0);
        let podcast = derive_applied_thresholds(AggressionLevel::Medium, true, SignalStrength::Strong, "podcast_clip", 0.0);
        assert!(podcast.retention < short.retention);
    }
}
