//! Decode analysis-only JPEG frames into a working directory, for sidecar
//! extractors (OCR/emotion) that need still images rather than a live stream.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use vclip_models::constants::{ANALYSIS_FRAME_FPS_DEFAULT, ANALYSIS_FRAME_SCALE_WIDTH_DEFAULT};

use super::analysis_horizon;

/// Decode frames at `ANALYSIS_FRAME_FPS_DEFAULT`, scaled to
/// `ANALYSIS_FRAME_SCALE_WIDTH_DEFAULT` wide, into `out_dir/frame_%06d.jpg`.
/// Returns the sorted list of produced file paths; `vec![]` on any failure.
pub async fn extract_frames(input: &Path, duration_secs: f64, out_dir: &Path) -> Vec<PathBuf> {
    let horizon = analysis_horizon(duration_secs);
    if horizon <= 0.0 {
        return Vec::new();
    }

    if tokio::fs::create_dir_all(out_dir).await.is_err() {
        return Vec::new();
    }

    let pattern = out_dir.join("frame_%06d.jpg");
    let filter = format!(
        "fps={ANALYSIS_FRAME_FPS_DEFAULT},scale={ANALYSIS_FRAME_SCALE_WIDTH_DEFAULT}:-2"
    );

    let status = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-nostats",
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-t",
            &horizon.to_string(),
            "-vf",
            &filter,
            "-q:v",
            "4",
            &pattern.to_string_lossy(),
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => {
            debug!(code = ?s.code(), "frame extraction: ffmpeg exited non-zero");
            return Vec::new();
        }
        Err(e) => {
            debug!(error = %e, "frame extraction: failed to spawn ffmpeg");
            return Vec::new();
        }
    }

    let mut entries = match tokio::fs::read_dir(out_dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut frames = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            frames.push(path);
        }
    }
    frames.sort();
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_input_yields_empty_list() {
        let dir = std::env::temp_dir().join(format!("vclip-media-frames-{}", std::process::id()));
        let frames = extract_frames(Path::new("/nonexistent/input.mp4"), 10.0, &dir).await;
        assert!(frames.is_empty());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
