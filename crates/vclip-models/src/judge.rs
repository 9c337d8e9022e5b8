//! Retention judge scoring report (spec.md §3 "RetentionJudgeReport").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Threshold-gate mode the judge ran under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    Strict,
    Adaptive,
}

impl Default for GateMode {
    fn default() -> Self {
        GateMode::Adaptive
    }
}

/// Which of the four scored dimensions the judge recommends improving next
/// (spec.md §3 "required_fixes{stronger_hook,raise_emotion,improve_pacing,
/// increase_interrupts}").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequiredFixes {
    #[serde(default)]
    pub stronger_hook: bool,
    #[serde(default)]
    pub raise_emotion: bool,
    #[serde(default)]
    pub improve_pacing: bool,
    #[serde(default)]
    pub increase_interrupts: bool,
}

impl RequiredFixes {
    pub fn any(&self) -> bool {
        self.stronger_hook || self.raise_emotion || self.improve_pacing || self.increase_interrupts
    }
}

/// The thresholds actually applied for this judge run, after aggression,
/// transcript-availability, signal-strength, format, and platform offsets
/// (spec.md §4 "applied_thresholds").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppliedThresholds {
    pub retention: f64,
    pub hook_strength: f64,
    pub pacing: f64,
    pub clarity: f64,
}

/// The judge's full multi-metric report for one edit plan (spec.md §3
/// "RetentionJudgeReport").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetentionJudgeReport {
    pub retention_score: f64,
    pub hook_strength: f64,
    pub pacing_score: f64,
    pub clarity_score: f64,
    pub emotional_pull: f64,
    pub content_format: String,
    pub target_platform: String,
    pub strategy_profile: String,
    #[serde(default)]
    pub why_keep_watching: Vec<String>,
    #[serde(default)]
    pub what_is_generic: Vec<String>,
    pub required_fixes: RequiredFixes,
    pub applied_thresholds: AppliedThresholds,
    pub gate_mode: GateMode,
    pub passed: bool,
}

impl RetentionJudgeReport {
    /// `passed` iff all four scores meet `applied_thresholds`
    /// (spec.md §4 "`passed` iff all four scores meet thresholds").
    pub fn recompute_passed(&mut self) {
        self.passed = self.retention_score >= self.applied_thresholds.retention
            && self.hook_strength >= self.applied_thresholds.hook_strength
            && self.pacing_score >= self.applied_thresholds.pacing
            && self.clarity_score >= self.applied_thresholds.clarity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RetentionJudgeReport {
        RetentionJudgeReport {
            retention_score: 72.0,
            hook_strength: 65.0,
            pacing_score: 70.0,
            clarity_score: 80.0,
            emotional_pull: 60.0,
            content_format: "short_form".into(),
            target_platform: "tiktok".into(),
            strategy_profile: "BASELINE".into(),
            why_keep_watching: vec!["strong opening hook".into()],
            what_is_generic: vec![],
            required_fixes: RequiredFixes::default(),
            applied_thresholds: AppliedThresholds {
                retention: 70.0,
                hook_strength: 60.0,
                pacing: 65.0,
                clarity: 70.0,
            },
            gate_mode: GateMode::Adaptive,
            passed: false,
        }
    }

    #[test]
    fn recompute_passed_true_when_all_scores_clear() {
        let mut report = sample_report();
        report.recompute_passed();
        assert!(report.passed);
    }

    #[test]
    fn recompute_passed_false_when_one_score_misses() {
        let mut report = sample_report();
        report.hook_strength = 40.0;
        report.recompute_passed();
        assert!(!report.passed);
    }

    #[test]
    fn required_fixes_any() {
        let mut fixes = RequiredFixes::default();
        assert!(!fixes.any());
        fixes.improve_pacing = true;
        assert!(fixes.any());
    }
}
