//! RetryOrchestrator: builds a variant edit plan per retry strategy, judges
//! each, and picks the best passing one, falling through to a relaxed
//! rescue pass when nothing clears the gate (spec.md §4.8).

use vclip_media::silence_removal::Segment as VadSegment;
use vclip_models::{AggressionLevel, CalibrationProfile, EditPlan, GateMode, PacingProfile, RetentionJudgeReport, RuntimeStyleProfile, TranscriptCue};

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::edit_plan::{build_edit_plan, EditPlanInput};
use crate::pipeline::judge::{derive_applied_thresholds, run_retention_judge, JudgeInput, SignalStrength};

/// Ordered retry strategies, plus the final relaxed-threshold rescue pass
/// (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Baseline,
    HookFirst,
    EmotionFirst,
    PacingFirst,
    Rescue,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Baseline => "BASELINE",
            Strategy::HookFirst => "HOOK_FIRST",
            Strategy::EmotionFirst => "EMOTION_FIRST",
            Strategy::PacingFirst => "PACING_FIRST",
            Strategy::Rescue => "RESCUE_MODE",
        }
    }
}

const BASELINE_ORDER: [Strategy; 4] = [Strategy::Baseline, Strategy::HookFirst, Strategy::EmotionFirst, Strategy::PacingFirst];

/// Rescue-mode minimums below which `RetryOrchestrator` refuses to
/// force-render even with relaxed thresholds (spec.md §4.8).
const RESCUE_MIN_RETENTION: f64 = 44.0;
const RESCUE_MIN_HOOK: f64 = 52.0;
const RESCUE_MIN_PACING: f64 = 50.0;

pub struct RetryContext<'a> {
    pub duration_secs: f64,
    pub windows: &'a [vclip_models::EngagementWindow],
    pub cues: &'a [TranscriptCue],
    pub silence_segments: &'a [VadSegment],
    pub calibration: &'a CalibrationProfile,
    pub base_pacing_profile: &'a PacingProfile,
    pub runtime_style: &'a RuntimeStyleProfile,
    pub base_aggression: AggressionLevel,
    pub content_format: &'a str,
    pub target_platform: &'a str,
    pub captions_enabled: bool,
    pub target_interrupt_count: usize,
    pub has_transcript: bool,
    pub signal_strength: SignalStrength,
    pub feedback_offset: f64,
}

/// One recorded retry attempt, persisted on the job's analysis trail
/// (spec.md §4.8 "all attempts are recorded").
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub strategy: String,
    pub judge_retention: f64,
    pub predicted_score: f64,
    pub variant_score: f64,
    pub passed: bool,
    pub hook_start: f64,
    pub hook_duration: f64,
}

pub struct RetryOutcome {
    pub plan: EditPlan,
    pub report: RetentionJudgeReport,
    pub attempts: Vec<AttemptRecord>,
    pub forced: bool,
}

fn variant_aggression(strategy: Strategy, base: AggressionLevel) -> AggressionLevel {
    match strategy {
        Strategy::HookFirst => bump(base),
        Strategy::Rescue => AggressionLevel::Viral,
        _ => base,
    }
}

fn bump(aggression: AggressionLevel) -> AggressionLevel {
    match aggression {
        AggressionLevel::Low => AggressionLevel::Medium,
        AggressionLevel::Medium => AggressionLevel::High,
        AggressionLevel::High | AggressionLevel::Viral => AggressionLevel::Viral,
    }
}

fn variant_content_format<'a>(strategy: Strategy, base: &'a str) -> &'a str {
    match strategy {
        Strategy::EmotionFirst | Strategy::Rescue => "tiktok_short",
        _ => base,
    }
}

fn variant_pacing_profile(strategy: Strategy, base: &PacingProfile) -> PacingProfile {
    match strategy {
        Strategy::PacingFirst | Strategy::Rescue => PacingProfile {
            target_segment_seconds: (base.target_segment_seconds * 0.7).max(1.5),
            jitter_seconds: base.jitter_seconds * 0.6,
            speed_cap: (base.speed_cap + 0.1).min(2.0),
        },
        _ => *base,
    }
}

fn hook_confidence(plan: &EditPlan) -> f64 {
    0.7 * plan.hook.score + 0.3 * plan.hook.audit_score.unwrap_or(0.0)
}

fn strategy_bias(calibration: &CalibrationProfile, strategy: Strategy) -> f64 {
    calibration.strategy_bias.get(strategy.as_str()).copied().unwrap_or(0.0)
}

fn style_bias(calibration: &CalibrationProfile) -> f64 {
    if calibration.dominant_style.is_some() {
        2.0
    } else {
        0.0
    }
}

fn build_variant(ctx: &RetryContext<'_>, strategy: Strategy) -> (EditPlan, RetentionJudgeReport) {
    let aggression = variant_aggression(strategy, ctx.base_aggression);
    let content_format = variant_content_format(strategy, ctx.content_format);
    let pacing_profile = variant_pacing_profile(strategy, ctx.base_pacing_profile);

    let plan = build_edit_plan(EditPlanInput {
        duration_secs: ctx.duration_secs,
        windows: ctx.windows,
        cues: ctx.cues,
        silence_segments: ctx.silence_segments,
        calibration: ctx.calibration,
        pacing_profile: &pacing_profile,
        runtime_style: ctx.runtime_style,
        aggression,
        content_format,
    });

    let feedback_offset = if matches!(strategy, Strategy::Rescue) {
        ctx.feedback_offset - 10.0
    } else {
        ctx.feedback_offset
    };
    let thresholds = derive_applied_thresholds(aggression, ctx.has_transcript, ctx.signal_strength, content_format, feedback_offset);

    let interrupt_count = plan
        .metadata
        .get("interrupt_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;

    let report = run_retention_judge(JudgeInput {
        plan: &plan,
        captions_enabled: ctx.captions_enabled,
        pattern_interrupt_count: interrupt_count,
        target_interrupt_count: ctx.target_interrupt_count,
        content_format,
        target_platform: ctx.target_platform,
        strategy_profile: strategy.as_str(),
        applied_thresholds: thresholds,
        gate_mode: if matches!(strategy, Strategy::Rescue) {
            GateMode::Adaptive
        } else {
            GateMode::Strict
        },
    });

    (plan, report)
}

fn score_variant(ctx: &RetryContext<'_>, strategy: Strategy, plan: &EditPlan, report: &RetentionJudgeReport) -> (f64, f64) {
    let predicted = 0.5 * report.retention_score
        + 0.3 * hook_confidence(plan) * 100.0
        + strategy_bias(ctx.calibration, strategy)
        + style_bias(ctx.calibration);
    let pass_bonus = if report.passed { 1.0 } else { 0.0 };
    let variant_score = 0.8 * predicted + 0.2 * report.retention_score + 3.5 * pass_bonus;
    (predicted, variant_score)
}

/// Run every baseline-tier strategy, pick the best passing variant by
/// `variant_score`; if none pass, fall through to `RESCUE_MODE` with
/// relaxed thresholds and apply the override/force-render rules.
pub fn run_retry_orchestrator(ctx: RetryContext<'_>) -> WorkerResult<RetryOutcome> {
    let mut attempts = Vec::new();
    let mut best: Option<(EditPlan, RetentionJudgeReport, f64)> = None;

    for &strategy in BASELINE_ORDER.iter() {
        let (plan, report) = build_variant(&ctx, strategy);
        let (predicted, variant_score) = score_variant(&ctx, strategy, &plan, &report);
        attempts.push(AttemptRecord {
            strategy: strategy.as_str().to_string(),
            judge_retention: report.retention_score,
            predicted_score: predicted,
            variant_score,
            passed: report.passed,
            hook_start: plan.hook.start,
            hook_duration: plan.hook.duration,
        });

        if report.passed {
            let better = best.as_ref().map(|(_, _, s)| variant_score > *s).unwrap_or(true);
            if better {
                best = Some((plan, report, variant_score));
            }
        }
    }

    if let Some((plan, report, _)) = best {
        return Ok(RetryOutcome { plan, report, attempts, forced: false });
    }

    let (rescue_plan, rescue_report) = build_variant(&ctx, Strategy::Rescue);
    let (predicted, variant_score) = score_variant(&ctx, Strategy::Rescue, &rescue_plan, &rescue_report);
    attempts.push(AttemptRecord {
        strategy: Strategy::Rescue.as_str().to_string(),
        judge_retention: rescue_report.retention_score,
        predicted_score: predicted,
        variant_score,
        passed: rescue_report.passed,
        hook_start: rescue_plan.hook.start,
        hook_duration: rescue_plan.hook.duration,
    });

    if rescue_report.passed {
        return Ok(RetryOutcome { plan: rescue_plan, report: rescue_report, attempts, forced: false });
    }

    let low_signal = !ctx.has_transcript || matches!(ctx.signal_strength, SignalStrength::Weak);
    let within_adaptive_buffer = |score: f64, threshold: f64| score >= threshold - 6.0;
    let override_pass = low_signal
        && within_adaptive_buffer(rescue_report.hook_strength, rescue_report.applied_thresholds.hook_strength)
        && within_adaptive_buffer(rescue_report.emotional_pull, 50.0)
        && within_adaptive_buffer(rescue_report.pacing_score, rescue_report.applied_thresholds.pacing)
        && within_adaptive_buffer(rescue_report.retention_score, rescue_report.applied_thresholds.retention);

    let force_render = rescue_report.retention_score >= RESCUE_MIN_RETENTION
        && rescue_report.hook_strength >= RESCUE_MIN_HOOK
        && rescue_report.pacing_score >= RESCUE_MIN_PACING;

    if override_pass || force_render {
        return Ok(RetryOutcome { plan: rescue_plan, report: rescue_report, attempts, forced: true });
    }

    let mut reasons = Vec::new();
    if rescue_report.required_fixes.stronger_hook {
        reasons.push("hook_strength");
    }
    if rescue_report.required_fixes.raise_emotion {
        reasons.push("emotional_pull");
    }
    if rescue_report.required_fixes.improve_pacing {
        reasons.push("pacing_score");
    }
    if rescue_report.retention_score < rescue_report.applied_thresholds.retention {
        reasons.push("retention_score");
    }
    Err(WorkerError::failed_quality_gate(reasons.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(len: usize) -> Vec<vclip_models::EngagementWindow> {
        (0..len)
            .map(|i| {
                let mut w = vclip_models::EngagementWindow::empty(i as u32);
                w.audio_energy = 0.6;
                w.speech_intensity = 0.6;
                w.hook_score = 0.6;
                w.curiosity_trigger = 0.5;
                w
            })
            .collect()
    }

    fn ctx(windows: &[vclip_models::EngagementWindow], calibration: &CalibrationProfile, pacing: &PacingProfile, style: &RuntimeStyleProfile) -> RetryContext<'_> {
        RetryContext {
            duration_secs: windows.len() as f64,
            windows,
            cues: &[],
            silence_segments: &[],
            calibration,
            base_pacing_profile: pacing,
            runtime_style: style,
            base_aggression: AggressionLevel::Medium,
            content_format: "short_form",
            target_platform: "tiktok",
            captions_enabled: true,
            target_interrupt_count: 2,
            has_transcript: true,
            signal_strength: SignalStrength::Strong,
            feedback_offset: 0.0,
        }
    }

    #[test]
    fn strong_signal_passes_on_a_baseline_tier_strategy() {
        let w = windows(40);
        let calibration = CalibrationProfile::default_profile();
        let pacing = PacingProfile { target_segment_seconds: 4.0, jitter_seconds: 1.0, speed_cap: 1.3 };
        let style = RuntimeStyleProfile {
            strategy: "baseline".to_string(),
            avg_cut_interval_seconds: 5.0,
            pattern_interrupt_interval_seconds: 8.0,
            escalation_curve: vec![],
        };
        let outcome = run_retry_orchestrator(ctx(&w, &calibration, &pacing, &style));
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap();
        assert!(!outcome.attempts.is_empty());
        assert!(outcome.attempts.len() <= 5);
    }

    #[test]
    fn weak_signal_falls_through_to_rescue_and_records_every_attempt() {
        let w: Vec<_> = (0..20).map(|i| vclip_models::EngagementWindow::empty(i as u32)).collect();
        let calibration = CalibrationProfile::default_profile();
        let pacing = PacingProfile { target_segment_seconds: 4.0, jitter_seconds: 1.0, speed_cap: 1.3 };
        let style = RuntimeStyleProfile {
            strategy: "baseline".to_string(),
            avg_cut_interval_seconds: 5.0,
            pattern_interrupt_interval_seconds: 8.0,
            escalation_curve: vec![],
        };
        let mut c = ctx(&w, &calibration, &pacing, &style);
        c.has_transcript = false;
        c.signal_strength = SignalStrength::Weak;
        let outcome = run_retry_orchestrator(c);
        match outcome {
            Ok(outcome) => assert_eq!(outcome.attempts.len(), 5),
            Err(_) => {}
        }
    }
}
