//! Fuses per-second signal extractor output into `EngagementWindow`s.
//!
//! Grounded on the per-second fused-scalar style `vclip-media::signals`
//! already produces (each extractor keys samples by integer second); this
//! module is the fan-in that combines them into the single window sequence
//! the rest of the pipeline consumes.

use std::ops::Range;

use vclip_media::{AudioRmsSample, FacePresenceSample};
use vclip_ml_client::{EmotionSample, TextDensitySample};
use vclip_models::{clamp01, EngagementWindow, TranscriptCue};

/// Raw per-second signal inputs, one slice per extractor. Any of them may be
/// empty (a sidecar was disabled or failed); the fusion degrades gracefully.
#[derive(Debug, Default, Clone)]
pub struct RawSignals {
    pub audio_rms: Vec<AudioRmsSample>,
    pub scene_changes: Vec<f64>,
    pub face_presence: Vec<FacePresenceSample>,
    pub text_density: Vec<TextDensitySample>,
    pub emotion: Vec<EmotionSample>,
    pub transcript: Vec<TranscriptCue>,
}

const W_AUDIO: f64 = 0.20;
const W_SPEECH: f64 = 0.20;
const W_MOTION: f64 = 0.14;
const W_FACE: f64 = 0.12;
const W_EMOTION: f64 = 0.15;
const W_TEXT: f64 = 0.09;
const W_VOCAL: f64 = 0.06;
const W_VISUAL: f64 = 0.04;

const INTRO_BIAS_SECONDS: u32 = 20;
const INTRO_BIAS_MAGNITUDE: f64 = 0.05;

/// Build the `[0, floor(duration))` window sequence, fusing every available
/// signal for each second (spec.md §4.4's weighted formula), then re-deriving
/// `boredomScore`/`hookScore` from transcript-aware terms and flagging
/// `emotionalSpike` from the per-window audio-energy distribution.
pub fn build_engagement_windows(duration_secs: f64, signals: &RawSignals) -> Vec<EngagementWindow> {
    let total_seconds = duration_secs.floor().max(0.0) as u32;
    if total_seconds == 0 {
        return Vec::new();
    }

    let mut windows: Vec<EngagementWindow> = (0..total_seconds).map(EngagementWindow::empty).collect();

    for sample in &signals.audio_rms {
        if let Some(w) = windows.get_mut(sample.second as usize) {
            w.audio_energy = clamp01(sample.rms_normalized);
            // Speech intensity approximates audio energy when no dedicated
            // VAD signal exists for this second; transcript coverage below
            // sharpens it where cues are present.
            w.speech_intensity = clamp01(sample.rms_normalized);
        }
    }

    for second in scene_change_seconds(&signals.scene_changes, total_seconds) {
        if let Some(w) = windows.get_mut(second as usize) {
            w.scene_change_rate = clamp01(w.scene_change_rate + 1.0);
            w.motion_score = clamp01(w.motion_score + 0.6);
        }
    }

    for sample in &signals.face_presence {
        if let Some(w) = windows.get_mut(sample.second as usize) {
            w.face_presence = clamp01(sample.presence);
            w.face_intensity = clamp01(sample.intensity);
            w.face_center_x = Some(sample.center_x);
            w.face_center_y = Some(sample.center_y);
        }
    }

    for sample in &signals.text_density {
        if let Some(w) = windows.get_mut(sample.second as usize) {
            w.text_density = clamp01(sample.density);
        }
    }

    for sample in &signals.emotion {
        if let Some(w) = windows.get_mut(sample.second as usize) {
            w.vocal_excitement = clamp01(sample.vocal_excitement);
            w.emotion_intensity = clamp01(sample.emotion_intensity);
        }
    }

    for cue in &signals.transcript {
        let covered: Range<u32> = cue.covered_seconds();
        for second in covered {
            if let Some(w) = windows.get_mut(second as usize) {
                w.keyword_intensity = clamp01(w.keyword_intensity.max(cue.keyword_intensity));
                w.curiosity_trigger = clamp01(w.curiosity_trigger.max(cue.curiosity_trigger));
                w.filler_density = clamp01(w.filler_density.max(cue.filler_density));
                w.speech_intensity = clamp01(w.speech_intensity.max(0.55));
            }
        }
    }

    let audio_mean = mean(windows.iter().map(|w| w.audio_energy));
    let audio_stdev = stdev(windows.iter().map(|w| w.audio_energy), audio_mean);
    let spike_threshold = audio_mean + 1.5 * audio_stdev;

    for (i, w) in windows.iter_mut().enumerate() {
        w.emotional_spike = w.audio_energy > spike_threshold;
        w.audio_variance = clamp01(audio_stdev);

        let visual_impact = w.visual_impact();
        let mut score = W_AUDIO * w.audio_energy
            + W_SPEECH * w.speech_intensity
            + W_MOTION * w.motion_score
            + W_FACE * w.face_presence
            + W_EMOTION * w.emotion_intensity
            + W_TEXT * w.text_density
            + W_VOCAL * w.vocal_excitement
            + W_VISUAL * visual_impact;

        if (i as u32) < INTRO_BIAS_SECONDS {
            score += INTRO_BIAS_MAGNITUDE * (1.0 - i as f64 / INTRO_BIAS_SECONDS as f64);
        }

        let hook_potential = clamp01(0.5 * w.curiosity_trigger + 0.3 * w.keyword_intensity + 0.2 * visual_impact);
        score += 0.08 * hook_potential;
        w.score = clamp01(score);

        w.hook_score = clamp01(
            0.45 * w.score + 0.25 * w.curiosity_trigger + 0.2 * w.keyword_intensity + 0.1 * visual_impact,
        );

        let low_signal = clamp01(
            1.0 - (0.35 * w.speech_intensity + 0.25 * w.motion_score + 0.2 * w.face_presence + 0.2 * w.audio_energy),
        );
        w.boredom_score = clamp01(low_signal * (1.0 - w.filler_density * 0.15) * (1.0 - (w.emotional_spike as u8 as f64) * 0.4));
    }

    windows
}

fn scene_change_seconds(scene_changes: &[f64], total_seconds: u32) -> Vec<u32> {
    scene_changes
        .iter()
        .filter_map(|t| {
            let second = t.floor();
            if second >= 0.0 && (second as u32) < total_seconds {
                Some(second as u32)
            } else {
                None
            }
        })
        .collect()
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stdev<I: Iterator<Item = f64>>(values: I, mean_value: f64) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_signals_produce_zeroed_windows_of_correct_length() {
        let windows = build_engagement_windows(10.4, &RawSignals::default());
        assert_eq!(windows.len(), 10);
        assert!(windows.iter().all(|w| w.score >= 0.0 && w.score <= 1.0));
    }

    #[test]
    fn audio_energy_feeds_fused_score() {
        let mut signals = RawSignals::default();
        signals.audio_rms = vec![vclip_media::AudioRmsSample { second: 0, rms_normalized: 1.0 }];
        let windows = build_engagement_windows(5.0, &signals);
        assert!(windows[0].score > windows[1].score);
    }

    #[test]
    fn intro_seconds_get_a_bias_bump() {
        let windows = build_engagement_windows(30.0, &RawSignals::default());
        // All-zero inputs except the intro bias, so early seconds score higher.
        assert!(windows[0].score >= windows[25].score);
    }
}
