//! Render configuration: the user-facing shape choice (spec.md §9 glossary
//! "Render config") and the related tuning knobs carried on `Job.renderSettings`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_VERTICAL_CLIPS;

/// `HorizontalModeOutput ∈ {quality, source, {w,h}}` (spec.md §9 "Runtime
/// reflection of configuration").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HorizontalModeOutput {
    /// Re-encode at a named quality preset (`standard`, `high`, ...).
    Quality { preset: QualityPreset },
    /// Keep the source's native resolution/bitrate envelope.
    Source,
    /// Explicit target dimensions.
    Dimensions { w: u32, h: u32 },
}

impl Default for HorizontalModeOutput {
    fn default() -> Self {
        HorizontalModeOutput::Quality {
            preset: QualityPreset::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Standard,
    High,
}

/// `VerticalLayoutMode ∈ {stacked, single}` (spec.md §4.9 "Vertical mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerticalLayoutMode {
    /// Webcam crop on top, fitted full frame on bottom.
    Stacked,
    /// A single fitted frame, no webcam crop.
    Single,
}

impl Default for VerticalLayoutMode {
    fn default() -> Self {
        VerticalLayoutMode::Single
    }
}

/// Output orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Horizontal,
    Vertical,
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::Horizontal
    }
}

/// How the source frame is fit into the target dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    Cover,
    Contain,
}

impl Default for FitMode {
    fn default() -> Self {
        FitMode::Cover
    }
}

/// One of `low|medium|high|viral` (spec.md §9 glossary "Aggression level").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggressionLevel {
    Low,
    Medium,
    High,
    Viral,
}

impl Default for AggressionLevel {
    fn default() -> Self {
        AggressionLevel::Medium
    }
}

impl AggressionLevel {
    /// Base hook-selection confidence threshold per level (spec.md §4.12).
    pub fn hook_selection_base_threshold(&self) -> f64 {
        match self {
            AggressionLevel::Low => 0.62,
            AggressionLevel::Medium => 0.68,
            AggressionLevel::High => 0.74,
            AggressionLevel::Viral => 0.80,
        }
    }
}

/// The full user-facing render configuration, persisted on `Job.renderSettings`
/// and round-tripped through `analysis` via `buildPersistedRenderSettings` /
/// `parseRenderConfigFromAnalysis` (spec.md §8 round-trip invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderConfig {
    #[serde(default)]
    pub mode: RenderMode,
    #[serde(default)]
    pub horizontal_output: HorizontalModeOutput,
    #[serde(default)]
    pub fit_mode: FitMode,
    #[serde(default)]
    pub vertical_layout: VerticalLayoutMode,
    #[serde(default = "default_vertical_clip_count")]
    pub vertical_clip_count: u32,
    #[serde(default)]
    pub webcam_crop_enabled: bool,
    #[serde(default)]
    pub aggression: AggressionLevel,
    #[serde(default)]
    pub auto_captions: bool,
    #[serde(default)]
    pub watermark_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
}

fn default_vertical_clip_count() -> u32 {
    1
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            horizontal_output: HorizontalModeOutput::default(),
            fit_mode: FitMode::default(),
            vertical_layout: VerticalLayoutMode::default(),
            vertical_clip_count: default_vertical_clip_count(),
            webcam_crop_enabled: false,
            aggression: AggressionLevel::default(),
            auto_captions: false,
            watermark_enabled: true,
            target_platform: None,
        }
    }
}

impl RenderConfig {
    /// Clamp `verticalClipCount` to `MAX_VERTICAL_CLIPS` (spec.md §8
    /// boundary: "Vertical with renderConfig.verticalClipCount >
    /// MAX_VERTICAL_CLIPS ⇒ clamp to 3").
    pub fn normalized(mut self) -> Self {
        if self.vertical_clip_count as usize > MAX_VERTICAL_CLIPS {
            self.vertical_clip_count = MAX_VERTICAL_CLIPS as u32;
        }
        if self.vertical_clip_count == 0 {
            self.vertical_clip_count = 1;
        }
        self
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self.mode, RenderMode::Vertical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_clip_count_is_clamped() {
        let cfg = RenderConfig {
            vertical_clip_count: 9,
            ..RenderConfig::default()
        }
        .normalized();
        assert_eq!(cfg.vertical_clip_count, MAX_VERTICAL_CLIPS as u32);
    }

    #[test]
    fn round_trip_preserves_fields() {
        let cfg = RenderConfig {
            mode: RenderMode::Vertical,
            horizontal_output: HorizontalModeOutput::Dimensions { w: 1080, h: 1920 },
            fit_mode: FitMode::Contain,
            vertical_layout: VerticalLayoutMode::Stacked,
            vertical_clip_count: 2,
            webcam_crop_enabled: true,
            aggression: AggressionLevel::Viral,
            auto_captions: true,
            watermark_enabled: false,
            target_platform: Some("tiktok".into()),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RenderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn aggression_thresholds_are_monotonic() {
        assert!(
            AggressionLevel::Low.hook_selection_base_threshold()
                < AggressionLevel::Viral.hook_selection_base_threshold()
        );
    }
}
