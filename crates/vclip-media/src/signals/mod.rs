//! Best-effort, per-second signal extraction over a decoded source file.
//!
//! Every extractor here follows the same contract: it invokes FFmpeg/FFprobe
//! with a filter that prints machine-parseable lines to stderr, scrapes the
//! lines the way `probe.rs`/`silence_removal::analyze` already do, and
//! returns an empty `Vec` rather than an error when anything goes wrong
//! (missing filter, unreadable output, no signal in this source). Callers
//! fuse whatever came back; a source with no face or no scene cuts still
//! produces a usable (if flatter) engagement curve.

pub mod audio_rms;
pub mod face_presence;
pub mod frame_extract;
pub mod scene_change;

pub use audio_rms::{extract_audio_rms, AudioRmsSample};
pub use face_presence::{extract_face_presence, FacePresenceSample};
pub use frame_extract::extract_frames;
pub use scene_change::extract_scene_changes;

use vclip_models::constants::HOOK_ANALYZE_MAX_SECONDS;

/// Clamp the analysis horizon the way every extractor needs to: beyond
/// `HOOK_ANALYZE_MAX_SECONDS` we simply stop decoding.
pub(crate) fn analysis_horizon(duration_secs: f64) -> f64 {
    duration_secs.min(HOOK_ANALYZE_MAX_SECONDS).max(0.0)
}

/// Parse a `key=value` pair out of an ffmpeg filter stderr line such as
/// `pts_time:12.34 lavfi.scene_score=0.512`, tolerating the two separator
/// styles ffmpeg filters use (`:` for `showinfo`, `=` for `ametadata`) and
/// keys that arrive with a dotted namespace prefix (`lavfi.astats...RMS_level`).
pub(crate) fn scrape_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let idx = line.find(key)?;
    let rest = &line[idx + key.len()..];
    let value = rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))?;
    let end = value
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .unwrap_or(value.len());
    let parsed = &value[..end];
    if parsed.is_empty() {
        None
    } else {
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_field_handles_colon_and_equals() {
        let line = "[Parsed_showinfo_1 @ 0x0] n:4 pts_time:1.5 pos:1234";
        assert_eq!(scrape_field(line, "pts_time"), Some("1.5"));

        let line2 = "[Parsed_ametadata_2] frame:12 pts_time:3.25 lavfi.astats.Overall.RMS_level=-18.2";
        assert_eq!(scrape_field(line2, "RMS_level"), Some("-18.2"));
    }

    #[test]
    fn analysis_horizon_clamps_to_cap() {
        assert_eq!(analysis_horizon(10_000.0), HOOK_ANALYZE_MAX_SECONDS);
        assert_eq!(analysis_horizon(30.0), 30.0);
    }
}
