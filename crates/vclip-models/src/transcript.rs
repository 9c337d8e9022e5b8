//! Transcript cues (spec.md §3 "TranscriptCue").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One transcribed span, annotated with the lexical signals
/// `BEST_MOMENT_SCORING` folds into `EngagementWindow` (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub keyword_intensity: f64,
    #[serde(default)]
    pub curiosity_trigger: f64,
    #[serde(default)]
    pub filler_density: f64,
}

impl TranscriptCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            keyword_intensity: 0.0,
            curiosity_trigger: 0.0,
            filler_density: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// The integer second window(s) this cue overlaps, inclusive of the
    /// start second, exclusive of `ceil(end)` when the cue ends exactly on a
    /// boundary (spec.md §4.4: cues are distributed onto whole-second
    /// `EngagementWindow`s by overlap).
    pub fn covered_seconds(&self) -> std::ops::Range<u32> {
        let start = self.start.floor().max(0.0) as u32;
        let end = self.end.ceil().max(self.start.floor() + 1.0) as u32;
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covered_seconds_spans_whole_range() {
        let cue = TranscriptCue::new(2.4, 5.1, "hello there");
        let range = cue.covered_seconds();
        assert_eq!(range.start, 2);
        assert_eq!(range.end, 6);
    }

    #[test]
    fn duration_is_nonnegative() {
        let cue = TranscriptCue::new(5.0, 5.0, "");
        assert_eq!(cue.duration(), 0.0);
    }
}
