//! The ordered edit plan that drives rendering (spec.md §9 glossary "Edit plan").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::engagement::EngagementWindow;
use crate::hook::HookCandidate;
use crate::segment::Segment;

/// A contiguous source-timeline range removed entirely (silence, boring
/// content) and recorded for the optimization-notes trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemovedRange {
    pub start: f64,
    pub end: f64,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Silence,
    Boring,
    PaceCompression,
}

/// A range whose duration was compressed (not removed) via segment speed-up,
/// kept distinct from `RemovedRange` for the optimization-notes narrative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompressedRange {
    pub start: f64,
    pub end: f64,
    pub speed: f64,
}

/// The ordered list of segments plus effects and metadata that drives
/// rendering (spec.md §9 glossary "Edit plan").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditPlan {
    pub hook: HookCandidate,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub removed_ranges: Vec<RemovedRange>,
    #[serde(default)]
    pub compressed_ranges: Vec<CompressedRange>,
    #[serde(default)]
    pub windows: Vec<EngagementWindow>,
    #[serde(default)]
    pub candidates: Vec<HookCandidate>,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl EditPlan {
    pub fn total_output_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.duration() / s.speed.max(f64::EPSILON))
            .sum()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_output_duration_accounts_for_speed() {
        let mut seg = Segment::new(0.0, 10.0);
        seg.speed = 2.0;
        let plan = EditPlan {
            hook: HookCandidate::new(0.0, 5.0, 0.8),
            segments: vec![seg],
            removed_ranges: vec![],
            compressed_ranges: vec![],
            windows: vec![],
            candidates: vec![],
            metadata: HashMap::new(),
        };
        assert_eq!(plan.total_output_duration(), 5.0);
        assert_eq!(plan.segment_count(), 1);
    }
}
