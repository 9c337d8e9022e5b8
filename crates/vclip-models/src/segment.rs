//! Timeline segment (spec.md §3 "Segment").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    SEGMENT_AUDIO_GAIN_MAX, SEGMENT_AUDIO_GAIN_MIN, SEGMENT_BRIGHTNESS_MAX,
    SEGMENT_BRIGHTNESS_MIN, SEGMENT_SPEED_MAX, SEGMENT_SPEED_MIN, SEGMENT_ZOOM_MAX,
    SEGMENT_ZOOM_MIN,
};

/// Cut style applied at a segment boundary during concat/xfade assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    Jump,
    Smooth,
}

impl Default for TransitionStyle {
    fn default() -> Self {
        TransitionStyle::Jump
    }
}

/// A half-open time range on the source timeline, optionally transformed
/// (spec.md §3 "Segment").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub zoom: f64,
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "default_audio_gain")]
    pub audio_gain: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_focus_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_focus_y: Option<f64>,
    #[serde(default)]
    pub transition_style: TransitionStyle,
    #[serde(default)]
    pub sound_fx_level: f64,
    #[serde(default)]
    pub emphasize: bool,
}

fn default_speed() -> f64 {
    1.0
}
fn default_audio_gain() -> f64 {
    1.0
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            speed: 1.0,
            zoom: 0.0,
            brightness: 0.0,
            audio_gain: 1.0,
            face_focus_x: None,
            face_focus_y: None,
            transition_style: TransitionStyle::Jump,
            sound_fx_level: 0.0,
            emphasize: false,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Clamp every field-bounded value into its spec.md §3 range. Called
    /// after any transform so the invariants in spec.md §8 always hold.
    pub fn clamp_fields(&mut self) {
        self.speed = self.speed.clamp(SEGMENT_SPEED_MIN, SEGMENT_SPEED_MAX);
        self.zoom = self.zoom.clamp(SEGMENT_ZOOM_MIN, SEGMENT_ZOOM_MAX);
        self.brightness = self
            .brightness
            .clamp(SEGMENT_BRIGHTNESS_MIN, SEGMENT_BRIGHTNESS_MAX);
        self.audio_gain = self
            .audio_gain
            .clamp(SEGMENT_AUDIO_GAIN_MIN, SEGMENT_AUDIO_GAIN_MAX);
    }

    /// True when every bounded field satisfies spec.md §8 invariant 1 and
    /// `start < end`.
    pub fn is_valid(&self, duration_cap: f64) -> bool {
        self.start >= 0.0
            && self.start < self.end
            && self.end <= duration_cap + 1e-6
            && (SEGMENT_SPEED_MIN..=SEGMENT_SPEED_MAX).contains(&self.speed)
            && (SEGMENT_ZOOM_MIN..=SEGMENT_ZOOM_MAX).contains(&self.zoom)
            && (SEGMENT_AUDIO_GAIN_MIN..=SEGMENT_AUDIO_GAIN_MAX).contains(&self.audio_gain)
    }

    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Reject (or clamp) a candidate list of segments so no two overlap and all
/// satisfy `Segment::is_valid`. Idempotent: sorting + de-overlap on an
/// already-valid, already-sorted list is a no-op (spec.md §8 round-trip
/// property `prepareSegmentsForRender`).
pub fn prepare_segments_for_render(mut segments: Vec<Segment>, duration: f64) -> Vec<Segment> {
    for seg in segments.iter_mut() {
        seg.clamp_fields();
    }
    segments.retain(|s| s.start < s.end);
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());

    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(prev) = out.last_mut() {
            if seg.start < prev.end {
                // Overlap: trim the new segment's start to the previous end.
                let mut trimmed = seg;
                trimmed.start = prev.end;
                if trimmed.start >= trimmed.end {
                    continue;
                }
                out.push(trimmed);
                continue;
            }
        }
        out.push(seg);
    }
    for seg in out.iter_mut() {
        seg.end = seg.end.min(duration);
    }
    out.retain(|s| s.start < s.end);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_segments_is_idempotent() {
        let segments = vec![
            Segment::new(0.0, 5.0),
            Segment::new(4.0, 9.0),
            Segment::new(20.0, 25.0),
        ];
        let once = prepare_segments_for_render(segments, 30.0);
        let twice = prepare_segments_for_render(once.clone(), 30.0);
        assert_eq!(once, twice);
        for w in once.windows(2) {
            assert!(!w[0].overlaps(&w[1]));
        }
    }

    #[test]
    fn clamp_fields_respects_bounds() {
        let mut seg = Segment::new(0.0, 1.0);
        seg.speed = 10.0;
        seg.zoom = 1.0;
        seg.audio_gain = 5.0;
        seg.clamp_fields();
        assert!(seg.is_valid(10.0));
    }

    #[test]
    fn end_clamped_to_duration() {
        let segments = vec![Segment::new(0.0, 50.0)];
        let out = prepare_segments_for_render(segments, 30.0);
        assert_eq!(out[0].end, 30.0);
    }
}
