//! Content style, niche, and pacing-profile inference.
//!
//! Grounded on `vclip_models::style`'s profile types; the averaging helpers
//! below follow the same per-window-mean idiom `engagement.rs` uses to
//! reduce a window sequence to scalars.

use vclip_models::constants::PACE_MIN_SECONDS;
use vclip_models::{
    ContentStyleKind, ContentStyleProfile, EngagementWindow, PacingProfile, RuntimeStyleProfile,
    StyleArchetypeBlend, TranscriptCue, VideoNicheKind, VideoNicheProfile,
};

const REACTION_KEYWORDS: &[&str] = &["reaction", "reacting", "watch this", "oh my god", "no way"];
const VLOG_KEYWORDS: &[&str] = &["today", "morning", "my day", "vlog", "let's go"];
const TUTORIAL_KEYWORDS: &[&str] = &["step", "first", "next", "how to", "tutorial", "let me show"];
const GAMING_KEYWORDS: &[&str] = &["clip", "kill", "game", "level", "boss", "stream"];
const STORY_KEYWORDS: &[&str] = &["so this happened", "story time", "one day", "i was"];

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn keyword_hits(cues: &[TranscriptCue], keywords: &[&str]) -> usize {
    let mut hits = 0;
    for cue in cues {
        let lower = cue.text.to_lowercase();
        if keywords.iter().any(|k| lower.contains(k)) {
            hits += 1;
        }
    }
    hits
}

/// Infer content style from transcript keyword hits plus window means.
pub fn infer_content_style(windows: &[EngagementWindow], cues: &[TranscriptCue]) -> ContentStyleProfile {
    let candidates: [(ContentStyleKind, &[&str]); 5] = [
        (ContentStyleKind::Reaction, REACTION_KEYWORDS),
        (ContentStyleKind::Vlog, VLOG_KEYWORDS),
        (ContentStyleKind::Tutorial, TUTORIAL_KEYWORDS),
        (ContentStyleKind::Gaming, GAMING_KEYWORDS),
        (ContentStyleKind::Story, STORY_KEYWORDS),
    ];

    let mut scored: Vec<(ContentStyleKind, f64, Vec<String>)> = candidates
        .iter()
        .map(|(kind, keywords)| {
            let hits = keyword_hits(cues, keywords);
            let mut rationale = Vec::new();
            if hits > 0 {
                rationale.push(format!("{hits} transcript keyword hit(s) for {kind:?}"));
            }
            (*kind, hits as f64, rationale)
        })
        .collect();

    let emotion_mean = mean(windows.iter().map(|w| w.emotion_intensity));
    let motion_mean = mean(windows.iter().map(|w| w.motion_score));

    for (kind, score, rationale) in scored.iter_mut() {
        match kind {
            ContentStyleKind::Reaction => {
                *score += emotion_mean * 2.0;
                if emotion_mean > 0.4 {
                    rationale.push("elevated emotion-intensity mean".to_string());
                }
            }
            ContentStyleKind::Gaming => {
                *score += motion_mean * 2.0;
                if motion_mean > 0.4 {
                    rationale.push("elevated motion-score mean".to_string());
                }
            }
            _ => {}
        }
    }

    let total: f64 = scored.iter().map(|(_, s, _)| s).sum::<f64>().max(1e-6);
    let (best_kind, best_score, rationale) = scored
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap_or((ContentStyleKind::Vlog, 0.0, Vec::new()));

    let mut rationale = rationale;
    if rationale.is_empty() {
        rationale.push("no strong signal; defaulting by elimination".to_string());
    }

    ContentStyleProfile {
        style: best_kind,
        confidence: (best_score / total).clamp(0.2, 0.95),
        rationale,
    }
}

/// Infer video niche from speech/scene/emotion averages and spike ratio.
pub fn infer_video_niche(windows: &[EngagementWindow]) -> VideoNicheProfile {
    if windows.is_empty() {
        return VideoNicheProfile {
            niche: VideoNicheKind::TalkingHead,
            confidence: 0.3,
        };
    }

    let speech_mean = mean(windows.iter().map(|w| w.speech_intensity));
    let scene_rate_mean = mean(windows.iter().map(|w| w.scene_change_rate));
    let emotion_mean = mean(windows.iter().map(|w| w.emotion_intensity));
    let spike_ratio = windows.iter().filter(|w| w.emotional_spike).count() as f64 / windows.len() as f64;
    let face_mean = mean(windows.iter().map(|w| w.face_presence));

    let high_energy_score = scene_rate_mean * 0.5 + spike_ratio * 0.5;
    let education_score = speech_mean * 0.6 + (1.0 - scene_rate_mean) * 0.4;
    let talking_head_score = face_mean * 0.6 + speech_mean * 0.2;
    let story_score = emotion_mean * 0.5 + speech_mean * 0.3;

    let candidates = [
        (VideoNicheKind::HighEnergy, high_energy_score),
        (VideoNicheKind::Education, education_score),
        (VideoNicheKind::TalkingHead, talking_head_score),
        (VideoNicheKind::Story, story_score),
    ];

    let (niche, score) = candidates
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap();

    VideoNicheProfile {
        niche,
        confidence: score.clamp(0.25, 0.95),
    }
}

/// Per-niche pacing targets, blended with style confidence (shrinks target
/// by up to 25% the way `PacingProfile::blended_with_style` documents).
pub fn derive_pacing_profile(niche: &VideoNicheProfile, style: &ContentStyleProfile) -> PacingProfile {
    let base = match niche.niche {
        VideoNicheKind::HighEnergy => PacingProfile {
            target_segment_seconds: PACE_MIN_SECONDS + 1.0,
            jitter_seconds: 0.6,
            speed_cap: 1.4,
        },
        VideoNicheKind::Education => PacingProfile {
            target_segment_seconds: 6.5,
            jitter_seconds: 1.2,
            speed_cap: 1.1,
        },
        VideoNicheKind::TalkingHead => PacingProfile {
            target_segment_seconds: 4.8,
            jitter_seconds: 1.0,
            speed_cap: 1.15,
        },
        VideoNicheKind::Story => PacingProfile {
            target_segment_seconds: 5.5,
            jitter_seconds: 1.1,
            speed_cap: 1.2,
        },
    };
    base.blended_with_style(style.confidence)
}

/// Resolve runtime style behavior (cut interval, interrupt interval,
/// escalation curve) from the chosen retention strategy tag.
pub fn resolve_runtime_style(strategy: &str, niche: &VideoNicheProfile) -> RuntimeStyleProfile {
    let base_cut_interval = match niche.niche {
        VideoNicheKind::HighEnergy => 3.2,
        VideoNicheKind::Education => 7.0,
        VideoNicheKind::TalkingHead => 5.2,
        VideoNicheKind::Story => 5.8,
    };
    let interrupt_interval = (base_cut_interval * 2.2).clamp(6.0, 18.0);
    let escalation_curve = vec![0.85, 0.9, 0.95, 1.0, 1.05];

    RuntimeStyleProfile {
        strategy: strategy.to_string(),
        avg_cut_interval_seconds: base_cut_interval,
        pattern_interrupt_interval_seconds: interrupt_interval,
        escalation_curve,
    }
}

/// Closest `ContentStyleKind` for a detected niche, used when the niche
/// suggests a secondary style archetype distinct from the primary.
fn niche_as_style(niche: VideoNicheKind) -> ContentStyleKind {
    match niche {
        VideoNicheKind::HighEnergy => ContentStyleKind::Gaming,
        VideoNicheKind::Education => ContentStyleKind::Tutorial,
        VideoNicheKind::TalkingHead => ContentStyleKind::Vlog,
        VideoNicheKind::Story => ContentStyleKind::Story,
    }
}

/// Blend a primary/secondary style when their confidences are close enough
/// to both matter (within 0.15 of each other).
pub fn resolve_style_blend(style: &ContentStyleProfile, niche: &VideoNicheProfile) -> StyleArchetypeBlend {
    let niche_style = niche_as_style(niche.niche);
    let secondary = if (style.confidence - niche.confidence).abs() < 0.15 && niche_style != style.style {
        Some(niche_style)
    } else {
        None
    };
    StyleArchetypeBlend {
        primary: style.style,
        secondary,
        blend_weight: style.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_default_without_panicking() {
        let style = infer_content_style(&[], &[]);
        assert!(style.confidence > 0.0);
        let niche = infer_video_niche(&[]);
        assert_eq!(niche.niche, VideoNicheKind::TalkingHead);
    }

    #[test]
    fn gaming_keywords_push_gaming_style() {
        let cues = vec![TranscriptCue::new(0.0, 2.0, "insane clip boss kill".to_string())];
        let style = infer_content_style(&[], &cues);
        assert_eq!(style.style, ContentStyleKind::Gaming);
    }
}
