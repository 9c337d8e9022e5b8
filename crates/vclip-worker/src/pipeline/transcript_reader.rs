//! Scores raw transcription-sidecar cues with the lexical signals
//! `EngagementModel` folds onto the window sequence (spec.md §4.3
//! TranscriptReader: "score keyword/curiosity/filler density per cue").
//!
//! `vclip_ml_client::TranscriptionClient` returns bare `{start,end,text}`
//! cues; this module is the scoring pass layered on top.

use vclip_models::{clamp01, TranscriptCue};

const CURIOSITY_MARKERS: &[&str] = &[
    "what happened", "you won't believe", "wait for it", "watch this", "here's why", "the reason",
    "nobody tells you", "secret", "turns out", "why", "how", "what if",
];
const KEYWORD_MARKERS: &[&str] = &[
    "never", "always", "best", "worst", "first", "biggest", "insane", "crazy", "huge", "actually",
    "literally", "finally",
];
const FILLER_MARKERS: &[&str] = &["um", "uh", "like, ", "you know", "kind of", "sort of", "i mean"];

/// Score each cue's `keyword_intensity`/`curiosity_trigger`/`filler_density`
/// in place based on lexical markers found in its text.
pub fn score_cues(cues: Vec<TranscriptCue>) -> Vec<TranscriptCue> {
    cues.into_iter()
        .map(|mut cue| {
            let lower = cue.text.to_lowercase();
            let word_count = lower.split_whitespace().count().max(1) as f64;

            let keyword_hits = KEYWORD_MARKERS.iter().filter(|m| lower.contains(*m)).count() as f64;
            let curiosity_hits = CURIOSITY_MARKERS.iter().filter(|m| lower.contains(*m)).count() as f64;
            let filler_hits = FILLER_MARKERS.iter().filter(|m| lower.contains(*m)).count() as f64;
            let ends_with_question = lower.trim_end().ends_with('?');

            cue.keyword_intensity = clamp01(keyword_hits / (word_count / 6.0).max(1.0));
            cue.curiosity_trigger =
                clamp01(curiosity_hits / (word_count / 8.0).max(1.0) + if ends_with_question { 0.25 } else { 0.0 });
            cue.filler_density = clamp01(filler_hits / word_count * 3.0);
            cue
        })
        .collect()
}

/// True when `ends_with_punctuation` and the opening word isn't a dangling
/// pronoun/connective — used by the hook audit's context-penalty term.
pub fn has_terminal_punctuation(text: &str) -> bool {
    matches!(text.trim_end().chars().last(), Some('.') | Some('!') | Some('?'))
}

const DANGLING_OPENERS: &[&str] = &[
    "it", "this", "that", "he", "she", "they", "and", "but", "so", "because", "then",
];

/// Penalty in [0,1] for a hook opening on a pronoun/connective with no
/// antecedent, or missing terminal punctuation (spec.md §4.6 hook search
/// "context-dependence penalty").
pub fn context_penalty(text: &str) -> f64 {
    let lower = text.trim().to_lowercase();
    let first_word = lower.split_whitespace().next().unwrap_or("");
    let mut penalty = 0.0;
    if DANGLING_OPENERS.contains(&first_word) {
        penalty += 0.5;
    }
    if !has_terminal_punctuation(text) {
        penalty += 0.2;
    }
    penalty.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curiosity_markers_raise_trigger_score() {
        let cues = vec![TranscriptCue::new(0.0, 3.0, "you won't believe what happened next")];
        let scored = score_cues(cues);
        assert!(scored[0].curiosity_trigger > 0.0);
    }

    #[test]
    fn filler_words_raise_filler_density() {
        let cues = vec![TranscriptCue::new(0.0, 3.0, "um, like, you know, it was uh fine")];
        let scored = score_cues(cues);
        assert!(scored[0].filler_density > 0.0);
    }

    #[test]
    fn dangling_pronoun_opener_is_penalized() {
        assert!(context_penalty("It was the best day") > 0.0);
        assert!(context_penalty("We went to the beach yesterday.") < context_penalty("It was amazing"));
    }
}
