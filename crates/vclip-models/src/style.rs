//! Style/niche/pacing profiles produced by StyleInference (spec.md §4.5).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentStyleKind {
    Reaction,
    Vlog,
    Tutorial,
    Gaming,
    Story,
}

/// Produced by `StyleInference` from transcript keyword hits plus window
/// means (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentStyleProfile {
    pub style: ContentStyleKind,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoNicheKind {
    HighEnergy,
    Education,
    TalkingHead,
    Story,
}

/// Produced from speech/scene/emotion averages and spike ratio (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoNicheProfile {
    pub niche: VideoNicheKind,
    pub confidence: f64,
}

/// Target segment lengths, jitter, and speed cap for a detected niche
/// (spec.md §9 glossary "Pacing profile").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PacingProfile {
    pub target_segment_seconds: f64,
    pub jitter_seconds: f64,
    pub speed_cap: f64,
}

/// Resolved from the chosen retention strategy (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeStyleProfile {
    pub strategy: String,
    pub avg_cut_interval_seconds: f64,
    pub pattern_interrupt_interval_seconds: f64,
    pub escalation_curve: Vec<f64>,
}

/// Blend of `ContentStyleProfile` and an external archetype collaborator,
/// feeding behavior-driven pacing shifts (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StyleArchetypeBlend {
    pub primary: ContentStyleKind,
    #[serde(default)]
    pub secondary: Option<ContentStyleKind>,
    pub blend_weight: f64,
}

impl PacingProfile {
    /// Blend this niche-derived profile with a style profile's confidence,
    /// nudging target segment length toward tighter cuts as confidence in a
    /// high-energy style rises.
    pub fn blended_with_style(&self, style_confidence: f64) -> PacingProfile {
        let shrink = 1.0 - 0.25 * style_confidence.clamp(0.0, 1.0);
        PacingProfile {
            target_segment_seconds: self.target_segment_seconds * shrink,
            jitter_seconds: self.jitter_seconds,
            speed_cap: self.speed_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blended_pacing_shrinks_target_with_confidence() {
        let base = PacingProfile {
            target_segment_seconds: 4.0,
            jitter_seconds: 0.5,
            speed_cap: 1.5,
        };
        let blended = base.blended_with_style(1.0);
        assert!(blended.target_segment_seconds < base.target_segment_seconds);
    }
}
