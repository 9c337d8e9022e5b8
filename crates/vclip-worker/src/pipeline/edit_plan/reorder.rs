//! Story reorder (spec.md §4.6 "Story reorder"): for short-form output, lift
//! one strong mid-video beat to the front and move one strong late beat to
//! the tail. Long-form output is always preserved in-order.

use vclip_models::{EngagementWindow, Segment};

/// A segment-index permutation: `reorder_map[new_index] = original_index`.
pub type ReorderMap = Vec<usize>;

fn segment_score(windows: &[EngagementWindow], segment: &Segment) -> f64 {
    let lo = (segment.start.floor() as usize).min(windows.len());
    let hi = (segment.end.ceil() as usize).min(windows.len());
    if hi <= lo {
        return 0.0;
    }
    let slice = &windows[lo..hi];
    slice.iter().map(|w| w.score).sum::<f64>() / slice.len() as f64
}

/// Reorder `segments` for `tiktok_short`-style output: pull the strongest
/// segment from the middle third to index 1 (or 2, whichever the hook
/// didn't already occupy), and push the strongest segment from the final
/// third to the tail. Returns the new segment order and the index map.
pub fn story_reorder(segments: Vec<Segment>, windows: &[EngagementWindow]) -> (Vec<Segment>, ReorderMap) {
    let n = segments.len();
    if n < 4 {
        return (segments.clone(), (0..n).collect());
    }

    let scores: Vec<f64> = segments.iter().map(|s| segment_score(windows, s)).collect();
    let mid_range = n / 3..(2 * n / 3).max(n / 3 + 1);
    let late_range = (2 * n / 3).max(1)..n;

    let mid_best = mid_range.clone().max_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap());
    let late_best = late_range.clone().max_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap());

    let mut order: Vec<usize> = (0..n).collect();

    if let Some(mid_idx) = mid_best {
        let from = order.iter().position(|&i| i == mid_idx).unwrap();
        let target = 1.min(order.len() - 1);
        let val = order.remove(from);
        order.insert(target, val);
    }

    if let Some(late_idx) = late_best {
        if let Some(from) = order.iter().position(|&i| i == late_idx) {
            if from != order.len() - 1 {
                let val = order.remove(from);
                order.push(val);
            }
        }
    }

    let reordered: Vec<Segment> = order.iter().map(|&i| segments[i].clone()).collect();
    (reordered, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_segment_lists_are_left_untouched() {
        let segments = vec![Segment::new(0.0, 1.0), Segment::new(1.0, 2.0)];
        let windows: Vec<_> = (0..2).map(EngagementWindow::empty).collect();
        let (reordered, map) = story_reorder(segments.clone(), &windows);
        assert_eq!(reordered, segments);
        assert_eq!(map, vec![0, 1]);
    }

    #[test]
    fn strong_mid_beat_moves_toward_the_front() {
        let segments: Vec<Segment> = (0..9).map(|i| Segment::new(i as f64, i as f64 + 1.0)).collect();
        let mut windows: Vec<_> = (0..9).map(EngagementWindow::empty).collect();
        windows[4].score = 0.95;
        let (_, map) = story_reorder(segments, &windows);
        let new_pos = map.iter().position(|&i| i == 4).unwrap();
        assert!(new_pos <= 1);
    }
}
