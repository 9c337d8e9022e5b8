//! Per-second fused signal samples (spec.md §3 "EngagementWindow").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Clamp a value into `[0.0, 1.0]`.
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// One second of fused signal, in `[0, floor(durationSec))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngagementWindow {
    pub time: u32,
    pub audio_energy: f64,
    pub speech_intensity: f64,
    pub motion_score: f64,
    pub face_presence: f64,
    pub face_intensity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_center_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_center_y: Option<f64>,
    pub text_density: f64,
    pub scene_change_rate: f64,
    pub emotional_spike: bool,
    pub vocal_excitement: f64,
    pub emotion_intensity: f64,
    pub audio_variance: f64,
    pub keyword_intensity: f64,
    pub curiosity_trigger: f64,
    pub filler_density: f64,
    pub boredom_score: f64,
    pub hook_score: f64,
    /// Fused engagement score (spec.md §4.4 formula).
    pub score: f64,
}

impl EngagementWindow {
    pub fn empty(time: u32) -> Self {
        Self {
            time,
            audio_energy: 0.0,
            speech_intensity: 0.0,
            motion_score: 0.0,
            face_presence: 0.0,
            face_intensity: 0.0,
            face_center_x: None,
            face_center_y: None,
            text_density: 0.0,
            scene_change_rate: 0.0,
            emotional_spike: false,
            vocal_excitement: 0.0,
            emotion_intensity: 0.0,
            audio_variance: 0.0,
            keyword_intensity: 0.0,
            curiosity_trigger: 0.0,
            filler_density: 0.0,
            boredom_score: 0.0,
            hook_score: 0.0,
            score: 0.0,
        }
    }

    /// Visual impact term used by the fusion formula: a blend of motion and
    /// scene-change-rate, both already in `[0,1]`.
    pub fn visual_impact(&self) -> f64 {
        clamp01(0.6 * self.motion_score + 0.4 * self.scene_change_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_zeroed_scores() {
        let w = EngagementWindow::empty(3);
        assert_eq!(w.time, 3);
        assert_eq!(w.score, 0.0);
        assert!(!w.emotional_spike);
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-1.0), 0.0);
        assert_eq!(clamp01(2.0), 1.0);
        assert_eq!(clamp01(0.4), 0.4);
    }
}
