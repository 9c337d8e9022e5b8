//! EditPlanner: composes signal-fusion output into the full `EditPlan`
//! (spec.md §4.6). Each sub-algorithm lives in its own module; this file is
//! the orchestrator that runs them in sequence and assembles the result.

mod boring;
mod hooks;
mod interrupts;
mod pacing;
mod reorder;
mod rhythm;
mod silence;

pub use hooks::{run_hook_audit, HookAudit};

use std::collections::HashMap;

use serde_json::json;
use vclip_media::silence_removal::Segment as VadSegment;
use vclip_models::constants::{LONG_FORM_CONTEXT_WINDOW_SECONDS, LONG_FORM_MIN_CONTEXT_SECONDS, LONG_FORM_RUNTIME_THRESHOLD_SECONDS};
use vclip_models::{
    prepare_segments_for_render, AggressionLevel, CalibrationProfile, CompressedRange, EditPlan, EngagementWindow,
    PacingProfile, RemovalReason, RemovedRange, RuntimeStyleProfile, Segment, TranscriptCue,
};

/// Everything the planner needs besides the raw signal extractors, which the
/// top-level pipeline orchestrator has already fused into `windows`.
pub struct EditPlanInput<'a> {
    pub duration_secs: f64,
    pub windows: &'a [EngagementWindow],
    pub cues: &'a [TranscriptCue],
    pub silence_segments: &'a [VadSegment],
    pub calibration: &'a CalibrationProfile,
    pub pacing_profile: &'a PacingProfile,
    pub runtime_style: &'a RuntimeStyleProfile,
    pub aggression: AggressionLevel,
    pub content_format: &'a str,
}

/// Run the full EditPlanner pipeline: silence trim, boring removal, pacing
/// segmentation, rhythm alignment, hook search + audit, pattern interrupts,
/// the long-form context floor, ending-spike enforcement, and story reorder.
pub fn build_edit_plan(input: EditPlanInput<'_>) -> EditPlan {
    let silence_ranges = silence::removed_ranges_from_vad(input.silence_segments);
    let boring_ranges = boring::boring_removed_ranges(input.windows, input.aggression);
    let removed_ranges = merge_removed_ranges(silence_ranges, boring_ranges);

    let mut segments = build_segments_excluding_removed(input.windows, &removed_ranges, input.pacing_profile);

    let anchors = rhythm::detect_anchors(input.windows);
    segments = rhythm::align_to_anchors(segments, input.windows, &anchors);

    let (hook, candidates) = hooks::search_hooks(input.windows, input.cues, input.calibration);

    if input.duration_secs >= LONG_FORM_RUNTIME_THRESHOLD_SECONDS {
        insert_long_form_context_floor(&mut segments, input.windows);
    }

    let interrupt_count = {
        let mut segs = segments.clone();
        let placed = interrupts::inject_pattern_interrupts(&mut segs, input.runtime_style);
        segments = segs;
        placed
    };

    enforce_ending_spike(&mut segments, input.windows);

    let reorder_map = if input.content_format == "tiktok_short" {
        let (reordered, map) = reorder::story_reorder(segments, input.windows);
        segments = reordered;
        map
    } else {
        (0..segments.len()).collect()
    };

    segments = prepare_segments_for_render(segments, input.duration_secs);
    let compressed_ranges = compressed_ranges_from_segments(&segments);

    let boredom_ratio = if input.windows.is_empty() {
        0.0
    } else {
        input.windows.iter().map(|w| w.boredom_score).sum::<f64>() / input.windows.len() as f64
    };

    let mut metadata = HashMap::new();
    metadata.insert("interrupt_count".to_string(), json!(interrupt_count));
    metadata.insert(
        "interrupt_density".to_string(),
        json!(if input.duration_secs > 0.0 {
            interrupt_count as f64 / input.duration_secs
        } else {
            0.0
        }),
    );
    metadata.insert("boredom_ratio".to_string(), json!(boredom_ratio));
    metadata.insert("reorder_map".to_string(), json!(reorder_map));
    metadata.insert("runtime_strategy".to_string(), json!(input.runtime_style.strategy));

    EditPlan {
        hook,
        segments,
        removed_ranges,
        compressed_ranges,
        windows: input.windows.to_vec(),
        candidates,
        metadata,
    }
}

fn merge_removed_ranges(mut silence: Vec<RemovedRange>, mut boring: Vec<RemovedRange>) -> Vec<RemovedRange> {
    let mut all = Vec::with_capacity(silence.len() + boring.len());
    all.append(&mut silence);
    all.append(&mut boring);
    all.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
    all
}

/// Split the window sequence into spans not covered by `removed_ranges`,
/// pacing-segment each span independently, then offset the resulting
/// segments back onto the original timeline.
fn build_segments_excluding_removed(windows: &[EngagementWindow], removed_ranges: &[RemovedRange], profile: &PacingProfile) -> Vec<Segment> {
    let total = windows.len() as f64;
    if total <= 0.0 {
        return Vec::new();
    }

    let mut keep_spans: Vec<(f64, f64)> = Vec::new();
    let mut cursor = 0.0;
    for range in removed_ranges {
        if range.start > cursor {
            keep_spans.push((cursor, range.start.min(total)));
        }
        cursor = cursor.max(range.end);
    }
    if cursor < total {
        keep_spans.push((cursor, total));
    }

    let mut segments = Vec::new();
    for (start, end) in keep_spans {
        if end - start < 0.5 {
            continue;
        }
        let lo = start.floor() as usize;
        let hi = (end.ceil() as usize).min(windows.len());
        if hi <= lo {
            continue;
        }
        let span_windows = &windows[lo..hi];
        for mut segment in pacing::segment_for_pacing(span_windows, profile) {
            segment.start += lo as f64;
            segment.end += lo as f64;
            segment.end = segment.end.min(end);
            segment.start = segment.start.min(segment.end);
            segments.push(segment);
        }
    }
    segments
}

/// Insert a fixed-length context-floor segment right after the hook,
/// sourced from the first `LONG_FORM_CONTEXT_WINDOW_SECONDS` of the
/// timeline, when one doesn't already exist (spec.md §8 boundary case).
fn insert_long_form_context_floor(segments: &mut Vec<Segment>, windows: &[EngagementWindow]) {
    let has_floor = segments
        .iter()
        .take_while(|s| s.start < LONG_FORM_CONTEXT_WINDOW_SECONDS)
        .any(|s| s.duration() >= LONG_FORM_MIN_CONTEXT_SECONDS);
    if has_floor {
        return;
    }

    let window_end = LONG_FORM_CONTEXT_WINDOW_SECONDS.min(windows.len() as f64);
    let floor_end = LONG_FORM_MIN_CONTEXT_SECONDS.min(window_end);
    if floor_end <= 0.0 {
        return;
    }
    let mut floor_segment = Segment::new(0.0, floor_end);
    floor_segment.clamp_fields();
    segments.insert(0, floor_segment);
}

/// If the final 5s average hook-score is below 0.95x the overall mean,
/// append a truncated copy (≤5s) of the highest-scoring pre-tail segment.
fn enforce_ending_spike(segments: &mut Vec<Segment>, windows: &[EngagementWindow]) {
    if windows.len() < 10 || segments.is_empty() {
        return;
    }
    let overall_mean = windows.iter().map(|w| w.hook_score).sum::<f64>() / windows.len() as f64;
    let tail_start = (windows.len() as f64 - 5.0).max(0.0) as usize;
    let tail_slice = &windows[tail_start..];
    let tail_mean = tail_slice.iter().map(|w| w.hook_score).sum::<f64>() / tail_slice.len() as f64;

    if tail_mean >= 0.95 * overall_mean {
        return;
    }

    let pre_tail_end = segments.len().saturating_sub(1);
    let best = segments[..pre_tail_end.max(1)]
        .iter()
        .max_by(|a, b| {
            segment_hook_mean(windows, a)
                .partial_cmp(&segment_hook_mean(windows, b))
                .unwrap()
        })
        .cloned();

    if let Some(mut closer) = best {
        if closer.duration() > 5.0 {
            closer.end = closer.start + 5.0;
        }
        closer.clamp_fields();
        segments.push(closer);
    }
}

fn segment_hook_mean(windows: &[EngagementWindow], segment: &Segment) -> f64 {
    let lo = (segment.start.floor() as usize).min(windows.len());
    let hi = (segment.end.ceil() as usize).min(windows.len());
    if hi <= lo {
        return 0.0;
    }
    windows[lo..hi].iter().map(|w| w.hook_score).sum::<f64>() / (hi - lo) as f64
}

fn compressed_ranges_from_segments(segments: &[Segment]) -> Vec<CompressedRange> {
    segments
        .iter()
        .filter(|s| (s.speed - 1.0).abs() > 1e-6)
        .map(|s| CompressedRange {
            start: s.start,
            end: s.end,
            speed: s.speed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(len: usize) -> Vec<EngagementWindow> {
        (0..len).map(|i| EngagementWindow::empty(i as u32)).collect()
    }

    #[test]
    fn build_edit_plan_produces_nonempty_segments_for_plain_input() {
        let w = windows(40);
        let calibration = CalibrationProfile::default_profile();
        let pacing = PacingProfile {
            target_segment_seconds: 4.0,
            jitter_seconds: 1.0,
            speed_cap: 1.3,
        };
        let runtime_style = RuntimeStyleProfile {
            strategy: "baseline".to_string(),
            avg_cut_interval_seconds: 5.0,
            pattern_interrupt_interval_seconds: 8.0,
            escalation_curve: vec![],
        };
        let plan = build_edit_plan(EditPlanInput {
            duration_secs: 40.0,
            windows: &w,
            cues: &[],
            silence_segments: &[],
            calibration: &calibration,
            pacing_profile: &pacing,
            runtime_style: &runtime_style,
            aggression: AggressionLevel::Medium,
            content_format: "short_form",
        });
        assert!(!plan.segments.is_empty());
        assert!(plan.segments.iter().all(|s| s.end <= 40.0 + 1e-6));
    }

    #[test]
    fn removed_ranges_never_produce_overlapping_keep_segments() {
        let w = windows(60);
        let calibration = CalibrationProfile::default_profile();
        let pacing = PacingProfile {
            target_segment_seconds: 4.0,
            jitter_seconds: 1.0,
            speed_cap: 1.3,
        };
        let runtime_style = RuntimeStyleProfile {
            strategy: "baseline".to_string(),
            avg_cut_interval_seconds: 5.0,
            pattern_interrupt_interval_seconds: 8.0,
            escalation_curve: vec![],
        };
        let silence_segments = vec![VadSegment {
            start_ms: 10_000,
            end_ms: 20_000,
            label: vclip_media::silence_removal::SegmentLabel::Cut,
        }];
        let plan = build_edit_plan(EditPlanInput {
            duration_secs: 60.0,
            windows: &w,
            cues: &[],
            silence_segments: &silence_segments,
            calibration: &calibration,
            pacing_profile: &pacing,
            runtime_style: &runtime_style,
            aggression: AggressionLevel::Medium,
            content_format: "short_form",
        });
        for pair in plan.segments.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-6);
        }
    }
}
