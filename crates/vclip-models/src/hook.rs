//! Candidate opening hook (spec.md §3 "HookCandidate").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A candidate opening window plus the scores/audit outcome attached during
/// `HOOK_SELECT_AND_AUDIT` (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HookCandidate {
    pub start: f64,
    pub duration: f64,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_score: Option<f64>,
    #[serde(default)]
    pub audit_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True when this candidate was generated as a fallback rather than
    /// drawn from a genuine `EngagementWindow` peak (spec.md §4.6 rescue
    /// path: "if no candidate clears the audit bar, synthesize one from the
    /// single highest-scoring window").
    #[serde(default)]
    pub synthetic: bool,
}

impl HookCandidate {
    pub fn new(start: f64, duration: f64, score: f64) -> Self {
        Self {
            start,
            duration,
            score,
            audit_score: None,
            audit_passed: false,
            text: None,
            reason: None,
            synthetic: false,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn mark_audited(&mut self, audit_score: f64, passed: bool, reason: Option<String>) {
        self.audit_score = Some(audit_score);
        self.audit_passed = passed;
        self.reason = reason;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_candidate_is_unaudited() {
        let c = HookCandidate::new(4.0, 6.0, 0.7);
        assert_eq!(c.end(), 10.0);
        assert!(!c.audit_passed);
        assert!(c.audit_score.is_none());
    }

    #[test]
    fn mark_audited_sets_verdict() {
        let mut c = HookCandidate::new(0.0, 5.0, 0.5);
        c.mark_audited(61.0, true, Some("strong curiosity gap".into()));
        assert_eq!(c.audit_score, Some(61.0));
        assert!(c.audit_passed);
    }
}
