//! Pacing segmentation (spec.md §4.6 "Pacing segmentation"): cut the
//! surviving timeline into segments sized around `PacingProfile`'s target,
//! bounded by `[PACE_MIN_SECONDS, PACE_MAX_SECONDS]`, with per-segment speed
//! assigned to pull long/slow stretches toward the target without exceeding
//! `profile.speed_cap`.

use vclip_models::constants::{PACE_MAX_SECONDS, PACE_MIN_SECONDS};
use vclip_models::{EngagementWindow, PacingProfile, Segment};

/// Split `[0, windows.len())`, minus anything already covered by
/// `removed_ranges`, into pacing segments. Each segment's `speed` is nudged
/// above 1.0 when the segment runs longer than `profile.target_segment_seconds`
/// and the window mean boredom is elevated, capped at `profile.speed_cap`.
pub fn segment_for_pacing(windows: &[EngagementWindow], profile: &PacingProfile) -> Vec<Segment> {
    if windows.is_empty() {
        return Vec::new();
    }
    let total = windows.len() as f64;
    let target = profile
        .target_segment_seconds
        .clamp(PACE_MIN_SECONDS, PACE_MAX_SECONDS);

    let mut segments = Vec::new();
    let mut cursor = 0.0;
    while cursor < total {
        let remaining = total - cursor;
        // Fold the tail into this segment rather than leaving a sliver
        // shorter than PACE_MIN_SECONDS dangling at the end.
        let len = if remaining < target * 1.5 {
            remaining
        } else {
            target.min(PACE_MAX_SECONDS)
        };
        let end = (cursor + len).min(total);

        let mut segment = Segment::new(cursor, end);
        let boredom_mean = window_mean_boredom(windows, cursor, end);
        if segment.duration() > target && boredom_mean > 0.4 {
            let overrun_ratio = segment.duration() / target;
            segment.speed = (1.0 + 0.15 * (overrun_ratio - 1.0)).clamp(1.0, profile.speed_cap);
        }
        segment.clamp_fields();
        segments.push(segment);
        cursor = end;
    }
    segments
}

fn window_mean_boredom(windows: &[EngagementWindow], start: f64, end: f64) -> f64 {
    let lo = start.floor() as usize;
    let hi = (end.ceil() as usize).min(windows.len());
    if hi <= lo {
        return 0.0;
    }
    let slice = &windows[lo..hi];
    slice.iter().map(|w| w.boredom_score).sum::<f64>() / slice.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PacingProfile {
        PacingProfile {
            target_segment_seconds: 4.0,
            jitter_seconds: 1.0,
            speed_cap: 1.3,
        }
    }

    #[test]
    fn empty_windows_produce_no_segments() {
        assert!(segment_for_pacing(&[], &profile()).is_empty());
    }

    #[test]
    fn segments_cover_the_full_timeline_without_gaps() {
        let windows: Vec<_> = (0..20).map(EngagementWindow::empty).collect();
        let segments = segment_for_pacing(&windows, &profile());
        assert!(!segments.is_empty());
        assert_eq!(segments.first().unwrap().start, 0.0);
        assert_eq!(segments.last().unwrap().end, 20.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn segment_speeds_stay_within_cap() {
        let mut windows: Vec<_> = (0..20).map(EngagementWindow::empty).collect();
        for w in &mut windows {
            w.boredom_score = 0.9;
        }
        let profile = profile();
        let segments = segment_for_pacing(&windows, &profile);
        for s in &segments {
            assert!(s.speed <= profile.speed_cap + 1e-9);
        }
    }
}
