//! Boring-range detection and removal (spec.md §4.6 "Boring removal").

use vclip_models::constants::{CUT_MIN_SECONDS, MAX_CUT_RATIO, MAX_CUT_RATIO_AGGRESSIVE};
use vclip_models::{AggressionLevel, EngagementWindow, RemovalReason, RemovedRange};

/// A second is "boring" when speech, motion, face presence, and audio
/// energy are all low and it isn't an emotional spike.
fn is_boring(w: &EngagementWindow) -> bool {
    w.speech_intensity < 0.2
        && w.motion_score < 0.2
        && w.face_presence < 0.15
        && w.audio_energy < 0.25
        && !w.emotional_spike
}

/// Continuity-protection seconds: scene anchors, speech anchors, emotional
/// anchors. Cuts never cross these.
fn is_protected(w: &EngagementWindow) -> bool {
    w.scene_change_rate > 0.0 || w.speech_intensity > 0.5 || w.emotional_spike
}

/// Coalesce contiguous boring seconds into runs, drop runs shorter than
/// `CUT_MIN_SECONDS`, split runs at any protected second, then cap removal
/// of each surviving run at `MAX_CUT_RATIO` (`_AGGRESSIVE` at viral/high
/// aggression) by cutting a fixed length/gap pattern through the run
/// instead of removing it wholesale.
pub fn boring_removed_ranges(windows: &[EngagementWindow], aggression: AggressionLevel) -> Vec<RemovedRange> {
    let max_ratio = match aggression {
        AggressionLevel::Viral | AggressionLevel::High => MAX_CUT_RATIO_AGGRESSIVE,
        _ => MAX_CUT_RATIO,
    };

    let mut runs: Vec<(u32, u32)> = Vec::new();
    let mut run_start: Option<u32> = None;
    for (i, w) in windows.iter().enumerate() {
        let second = i as u32;
        if is_protected(w) {
            if let Some(start) = run_start.take() {
                runs.push((start, second));
            }
            continue;
        }
        if is_boring(w) {
            run_start.get_or_insert(second);
        } else if let Some(start) = run_start.take() {
            runs.push((start, second));
        }
    }
    if let Some(start) = run_start {
        runs.push((start, windows.len() as u32));
    }

    let mut ranges = Vec::new();
    for (start, end) in runs {
        let run_len = (end - start) as f64;
        if run_len < CUT_MIN_SECONDS {
            continue;
        }
        ranges.extend(split_run_under_cap(start as f64, end as f64, max_ratio));
    }
    ranges
}

/// Cut a fixed length/gap pattern through `[start,end)` so total cut time
/// stays within `run_len * max_ratio`: cut 2.5s, keep 1s, repeat.
fn split_run_under_cap(start: f64, end: f64, max_ratio: f64) -> Vec<RemovedRange> {
    let run_len = end - start;
    let cap = run_len * max_ratio;
    const CUT_CHUNK: f64 = 2.5;
    const KEEP_GAP: f64 = 1.0;

    let mut ranges = Vec::new();
    let mut cursor = start;
    let mut cut_so_far = 0.0;
    while cursor < end && cut_so_far < cap {
        let chunk_end = (cursor + CUT_CHUNK).min(end).min(start + cut_so_far + (cap - cut_so_far));
        let chunk_end = chunk_end.max(cursor);
        if chunk_end - cursor < 0.05 {
            break;
        }
        ranges.push(RemovedRange {
            start: cursor,
            end: chunk_end,
            reason: RemovalReason::Boring,
        });
        cut_so_far += chunk_end - cursor;
        cursor = chunk_end + KEEP_GAP;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boring_window(second: u32) -> EngagementWindow {
        let mut w = EngagementWindow::empty(second);
        w.speech_intensity = 0.0;
        w.motion_score = 0.0;
        w.face_presence = 0.0;
        w.audio_energy = 0.0;
        w
    }

    #[test]
    fn short_boring_runs_are_not_cut() {
        let windows: Vec<_> = (0..2).map(boring_window).collect();
        let ranges = boring_removed_ranges(&windows, AggressionLevel::Medium);
        assert!(ranges.is_empty());
    }

    #[test]
    fn long_boring_run_is_capped_below_max_ratio() {
        let windows: Vec<_> = (0..30).map(boring_window).collect();
        let ranges = boring_removed_ranges(&windows, AggressionLevel::Medium);
        let total_cut: f64 = ranges.iter().map(|r| r.end - r.start).sum();
        assert!(total_cut <= 30.0 * MAX_CUT_RATIO + 0.01);
        assert!(total_cut > 0.0);
    }

    #[test]
    fn protected_seconds_break_the_run() {
        let mut windows: Vec<_> = (0..10).map(boring_window).collect();
        windows[5].emotional_spike = true;
        let ranges = boring_removed_ranges(&windows, AggressionLevel::Medium);
        // No range should span across second 5.
        for r in &ranges {
            assert!(r.end <= 5.0 || r.start >= 5.0);
        }
    }
}
