//! Rhythm and emotional beat alignment (spec.md §4.6 "Rhythm & emotional
//! beat alignment"): detect anchors from a fused pulse, snap segment
//! boundaries onto nearby anchors, and trim bounded low-signal lead-ins
//! before emotional peaks.

use vclip_models::{EngagementWindow, Segment};

/// A detected rhythm or emotional-beat anchor, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub time: f64,
    pub is_emotional: bool,
}

const SNAP_TOLERANCE_SECONDS: f64 = 0.6;
const MAX_LEAD_IN_TRIM_SECONDS: f64 = 1.5;

fn pulse(w: &EngagementWindow) -> f64 {
    0.4 * w.audio_energy + 0.35 * w.scene_change_rate.min(1.0) + 0.25 * w.emotion_intensity
}

/// Local maxima of the fused audio/scene/emotion pulse, plus separate
/// emotional-beat peaks above an adaptive (mean + stdev) threshold.
pub fn detect_anchors(windows: &[EngagementWindow]) -> Vec<Anchor> {
    if windows.len() < 3 {
        return Vec::new();
    }
    let emotion_values: Vec<f64> = windows.iter().map(|w| w.emotion_intensity).collect();
    let emotion_mean = emotion_values.iter().sum::<f64>() / emotion_values.len() as f64;
    let emotion_var = emotion_values.iter().map(|v| (v - emotion_mean).powi(2)).sum::<f64>() / emotion_values.len() as f64;
    let emotion_threshold = emotion_mean + emotion_var.sqrt();

    let mut anchors = Vec::new();
    for i in 1..windows.len() - 1 {
        let (prev, cur, next) = (pulse(&windows[i - 1]), pulse(&windows[i]), pulse(&windows[i + 1]));
        if cur >= prev && cur >= next && cur > 0.0 {
            anchors.push(Anchor {
                time: i as f64 + 0.5,
                is_emotional: windows[i].emotion_intensity >= emotion_threshold,
            });
        }
    }
    anchors
}

/// Snap each segment boundary onto the nearest anchor within
/// `SNAP_TOLERANCE_SECONDS`, then trim up to `MAX_LEAD_IN_TRIM_SECONDS` of
/// low-signal lead-in immediately before any emotional-peak anchor that
/// falls inside a segment.
pub fn align_to_anchors(mut segments: Vec<Segment>, windows: &[EngagementWindow], anchors: &[Anchor]) -> Vec<Segment> {
    if anchors.is_empty() || segments.is_empty() {
        return segments;
    }

    for segment in segments.iter_mut() {
        if let Some(nearest) = nearest_within(anchors, segment.start, SNAP_TOLERANCE_SECONDS) {
            segment.start = nearest;
        }
        if let Some(nearest) = nearest_within(anchors, segment.end, SNAP_TOLERANCE_SECONDS) {
            segment.end = nearest;
        }
    }

    for segment in segments.iter_mut() {
        for anchor in anchors.iter().filter(|a| a.is_emotional && a.time > segment.start && a.time < segment.end) {
            let lead_in_start = (anchor.time - MAX_LEAD_IN_TRIM_SECONDS).max(segment.start);
            if low_signal_span(windows, lead_in_start, anchor.time) {
                segment.start = lead_in_start;
            }
        }
    }

    segments.retain(|s| s.end > s.start);
    segments
}

fn nearest_within(anchors: &[Anchor], target: f64, tolerance: f64) -> Option<f64> {
    anchors
        .iter()
        .map(|a| a.time)
        .filter(|t| (t - target).abs() <= tolerance)
        .min_by(|a, b| (a - target).abs().partial_cmp(&(b - target).abs()).unwrap())
}

fn low_signal_span(windows: &[EngagementWindow], start: f64, end: f64) -> bool {
    let lo = (start.floor() as usize).min(windows.len());
    let hi = (end.ceil() as usize).min(windows.len());
    if hi <= lo {
        return false;
    }
    windows[lo..hi].iter().all(|w| w.boredom_score > 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_pulse_has_no_anchors() {
        let windows: Vec<_> = (0..10).map(EngagementWindow::empty).collect();
        assert!(detect_anchors(&windows).is_empty());
    }

    #[test]
    fn a_single_spike_is_detected_as_an_anchor() {
        let mut windows: Vec<_> = (0..10).map(EngagementWindow::empty).collect();
        windows[5].audio_energy = 0.9;
        let anchors = detect_anchors(&windows);
        assert!(anchors.iter().any(|a| (a.time - 5.5).abs() < 1.0));
    }

    #[test]
    fn segment_boundaries_snap_to_nearby_anchors() {
        let anchors = vec![Anchor { time: 4.2, is_emotional: false }];
        let segments = vec![Segment::new(4.0, 10.0)];
        let windows: Vec<_> = (0..10).map(EngagementWindow::empty).collect();
        let aligned = align_to_anchors(segments, &windows, &anchors);
        assert_eq!(aligned[0].start, 4.2);
    }
}
