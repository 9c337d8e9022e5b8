//! Converts Silero-VAD segment labels into `RemovedRange`s, honoring the
//! minimum-silence and cut-padding constants (spec.md §4.6 "Silence trim").

use vclip_media::silence_removal::{Segment as VadSegment, SegmentLabel};
use vclip_models::constants::{SILENCE_MIN_SECONDS, SILENCE_PADDING_SECONDS};
use vclip_models::{RemovalReason, RemovedRange};

/// Silence ranges short enough to keep (< `SILENCE_MIN_SECONDS`) are dropped
/// from removal; surviving ranges are padded inward by `SILENCE_PADDING_SECONDS`
/// on each side so cuts don't clip the start/end of speech.
pub fn removed_ranges_from_vad(segments: &[VadSegment]) -> Vec<RemovedRange> {
    segments
        .iter()
        .filter(|s| s.label == SegmentLabel::Cut)
        .filter(|s| s.duration_secs() >= SILENCE_MIN_SECONDS)
        .map(|s| {
            let start_secs = s_start_secs(s);
            let end_secs = s_end_secs(s);
            let padded_start = (start_secs + SILENCE_PADDING_SECONDS).min(end_secs);
            let padded_end = (end_secs - SILENCE_PADDING_SECONDS).max(padded_start);
            RemovedRange {
                start: padded_start,
                end: padded_end,
                reason: RemovalReason::Silence,
            }
        })
        .filter(|r| r.end > r.start)
        .collect()
}

fn s_start_secs(s: &VadSegment) -> f64 {
    s.start_ms as f64 / 1000.0
}

fn s_end_secs(s: &VadSegment) -> f64 {
    s.end_ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_media::silence_removal::Segment as VadSegment;

    #[test]
    fn short_silences_are_dropped() {
        let segs = vec![VadSegment {
            start_ms: 1000,
            end_ms: 1300,
            label: SegmentLabel::Cut,
        }];
        assert!(removed_ranges_from_vad(&segs).is_empty());
    }

    #[test]
    fn long_silence_is_padded_inward() {
        let segs = vec![VadSegment {
            start_ms: 1000,
            end_ms: 3000,
            label: SegmentLabel::Cut,
        }];
        let ranges = removed_ranges_from_vad(&segs);
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].start > 1.0);
        assert!(ranges[0].end < 3.0);
    }
}
