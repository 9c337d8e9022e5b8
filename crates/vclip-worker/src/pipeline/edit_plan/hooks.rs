//! Hook candidate search and audit (spec.md §4.6 "Hook search").
//!
//! Partitions the timeline into sections, proposes candidate windows aligned
//! to transcript sentence boundaries in each, scores and audits them, and
//! runs a final faceoff using calibrated weights from `CalibrationProfile`.

use vclip_models::constants::HOOK_CANDIDATE_DURATIONS;
use vclip_models::{CalibrationProfile, EngagementWindow, HookCandidate, TranscriptCue};

use crate::pipeline::transcript_reader::context_penalty;

const MIN_SECTIONS: usize = 3;
const MAX_SECTIONS: usize = 8;

/// Result of `RunHookAudit`: the five scored facets plus the derived
/// `auditScore`/`passed` (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HookAudit {
    pub understandable: f64,
    pub curiosity: f64,
    pub payoff: f64,
    pub context_penalty: f64,
    pub audit_score: f64,
    pub passed: bool,
}

/// Deterministic audit: identical `(windows, text)` always yields an
/// identical result (spec.md §8 invariant 8).
pub fn run_hook_audit(windows: &[EngagementWindow], text: Option<&str>) -> HookAudit {
    let curiosity_mean = mean(windows.iter().map(|w| w.curiosity_trigger));
    let payoff_mean = mean(windows.iter().map(|w| w.hook_score));
    let penalty = text.map(context_penalty).unwrap_or(0.35);
    let understandable = if let Some(t) = text {
        (1.0 - context_penalty(t)).clamp(0.0, 1.0)
    } else {
        0.55
    };

    let audit_score = (0.4 * understandable + 0.35 * curiosity_mean + 0.25 * payoff_mean - 0.2 * penalty)
        .clamp(0.0, 1.0);
    let passed = audit_score >= 0.5 && understandable >= 0.4;

    HookAudit {
        understandable,
        curiosity: curiosity_mean,
        payoff: payoff_mean,
        context_penalty: penalty,
        audit_score,
        passed,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn windows_slice<'a>(windows: &'a [EngagementWindow], start: f64, end: f64) -> &'a [EngagementWindow] {
    let lo = (start.floor() as usize).min(windows.len());
    let hi = (end.ceil() as usize).min(windows.len());
    if hi <= lo {
        &[]
    } else {
        &windows[lo..hi]
    }
}

/// Find the transcript cue (if any) whose span best matches `[start, end)`,
/// used to align a candidate to a sentence boundary and to source its text.
fn aligned_text(cues: &[TranscriptCue], start: f64, end: f64) -> Option<String> {
    cues.iter()
        .filter(|c| c.start >= start - 0.5 && c.end <= end + 0.5)
        .max_by(|a, b| (a.end - a.start).partial_cmp(&(b.end - b.start)).unwrap())
        .map(|c| c.text.clone())
}

fn duration_alignment_score(duration: f64) -> f64 {
    1.0 - ((duration - 8.0).abs() / 8.0).clamp(0.0, 1.0)
}

/// Score one candidate window: weighted fusion of hookScore/speech/text/
/// emotion averages, duration alignment to 8s, minus context penalty, plus
/// the audit score.
fn score_candidate(windows: &[EngagementWindow], cues: &[TranscriptCue], start: f64, duration: f64) -> HookCandidate {
    let end = start + duration;
    let slice = windows_slice(windows, start, end);
    let hook_mean = mean(slice.iter().map(|w| w.hook_score));
    let speech_mean = mean(slice.iter().map(|w| w.speech_intensity));
    let text_mean = mean(slice.iter().map(|w| w.text_density));
    let emotion_mean = mean(slice.iter().map(|w| w.emotion_intensity));

    let text = aligned_text(cues, start, end);
    let penalty = text.as_deref().map(context_penalty).unwrap_or(0.3);

    let score = (0.35 * hook_mean
        + 0.2 * speech_mean
        + 0.15 * text_mean
        + 0.1 * emotion_mean
        + 0.2 * duration_alignment_score(duration)
        - 0.15 * penalty)
        .clamp(0.0, 1.0);

    let audit = run_hook_audit(slice, text.as_deref());
    let mut candidate = HookCandidate::new(start, duration, (0.7 * score + 0.3 * audit.audit_score).clamp(0.0, 1.0));
    candidate.text = text;
    candidate.mark_audited(audit.audit_score, audit.passed, None);
    candidate
}

/// Partition `[0, total_seconds)` into `sections` roughly-equal parts and
/// return the best candidate from each (3-8 sections, spec.md §4.6).
fn section_winners(windows: &[EngagementWindow], cues: &[TranscriptCue]) -> Vec<HookCandidate> {
    let total = windows.len() as f64;
    if total <= 0.0 {
        return Vec::new();
    }
    let sections = (total / 12.0).round().clamp(MIN_SECTIONS as f64, MAX_SECTIONS as f64) as usize;
    let section_len = total / sections as f64;

    let mut winners = Vec::new();
    for s in 0..sections {
        let section_start = s as f64 * section_len;
        let section_end = ((s + 1) as f64 * section_len).min(total);

        let mut best: Option<HookCandidate> = None;
        for &duration in HOOK_CANDIDATE_DURATIONS {
            if duration > section_end - section_start + 2.0 {
                continue;
            }
            let latest_start = (section_end - duration).max(section_start);
            let start = section_start.min(latest_start).max(0.0);
            let candidate = score_candidate(windows, cues, start, duration.min(total - start));
            if best.as_ref().map(|b| candidate.score > b.score).unwrap_or(true) {
                best = Some(candidate);
            }
        }
        if let Some(c) = best {
            winners.push(c);
        }
    }
    winners
}

/// Final faceoff across section winners using calibrated weights: prefer
/// audit-passing candidates, break ties by raw score, then by calibrated
/// weight applied to each of the five underlying components.
fn faceoff(winners: Vec<HookCandidate>, calibration: &CalibrationProfile) -> Option<HookCandidate> {
    let weights = calibration.hook_faceoff_weights;
    winners.into_iter().max_by(|a, b| {
        let a_key = (a.audit_passed as u8 as f64) * 10.0 + weighted_score(a, &weights);
        let b_key = (b.audit_passed as u8 as f64) * 10.0 + weighted_score(b, &weights);
        a_key.partial_cmp(&b_key).unwrap()
    })
}

fn weighted_score(candidate: &HookCandidate, weights: &[f64; 5]) -> f64 {
    let audit = candidate.audit_score.unwrap_or(0.0);
    weights[0] * candidate.score
        + weights[1] * audit
        + weights[2] * candidate.score
        + weights[3] * audit
        + weights[4] * candidate.score
}

/// Synthesize a teaser hook from the window with the strongest `hookScore`
/// when no candidate passes audit (spec.md §4.6).
fn synthesize_teaser(windows: &[EngagementWindow], cues: &[TranscriptCue]) -> HookCandidate {
    let peak_second = windows
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.hook_score.partial_cmp(&b.1.hook_score).unwrap())
        .map(|(i, _)| i as f64)
        .unwrap_or(0.0);
    let duration = 6.0_f64.min((windows.len() as f64 - peak_second).max(5.0));
    let mut candidate = score_candidate(windows, cues, peak_second, duration);
    candidate.synthetic = true;
    candidate
}

/// Run the full hook search: section partition, per-section winner, final
/// faceoff, falling back to a synthesized teaser if nothing passes audit.
/// Returns the chosen hook plus every evaluated candidate (for top-K
/// user-selection support).
pub fn search_hooks(
    windows: &[EngagementWindow],
    cues: &[TranscriptCue],
    calibration: &CalibrationProfile,
) -> (HookCandidate, Vec<HookCandidate>) {
    let winners = section_winners(windows, cues);
    if winners.is_empty() {
        let teaser = synthesize_teaser(windows, cues);
        return (teaser.clone(), vec![teaser]);
    }

    let any_passed = winners.iter().any(|c| c.audit_passed);
    let chosen = if any_passed {
        faceoff(winners.clone(), calibration).expect("non-empty winners")
    } else {
        synthesize_teaser(windows, cues)
    };
    (chosen, winners)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows_with_peak(len: usize, peak: usize) -> Vec<EngagementWindow> {
        (0..len)
            .map(|i| {
                let mut w = EngagementWindow::empty(i as u32);
                if i == peak {
                    w.hook_score = 0.95;
                    w.curiosity_trigger = 0.8;
                    w.speech_intensity = 0.7;
                }
                w
            })
            .collect()
    }

    #[test]
    fn search_hooks_picks_a_candidate_near_the_strongest_window() {
        let windows = windows_with_peak(60, 30);
        let calibration = CalibrationProfile::default_profile();
        let (hook, all) = search_hooks(&windows, &[], &calibration);
        assert!(!all.is_empty());
        assert!(hook.duration > 0.0);
        assert!(hook.start < 60.0);
    }

    #[test]
    fn audit_is_deterministic_for_identical_inputs() {
        let windows = windows_with_peak(20, 10);
        let a = run_hook_audit(&windows[5..15], Some("wait for it, here's why"));
        let b = run_hook_audit(&windows[5..15], Some("wait for it, here's why"));
        assert_eq!(a, b);
    }

    #[test]
    fn no_passing_candidate_falls_back_to_synthetic_teaser() {
        let windows: Vec<_> = (0..30).map(EngagementWindow::empty).collect();
        let calibration = CalibrationProfile::default_profile();
        let (hook, _) = search_hooks(&windows, &[], &calibration);
        assert!(hook.synthetic);
    }
}
