//! Scene-change timestamps via FFmpeg's `scene` score.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use vclip_models::constants::SCENE_CHANGE_THRESHOLD;

use super::{analysis_horizon, scrape_field};

/// Extract scene-change timestamps (seconds). Best-effort: `vec![]` on failure.
pub async fn extract_scene_changes(input: &Path, duration_secs: f64) -> Vec<f64> {
    let horizon = analysis_horizon(duration_secs);
    if horizon <= 0.0 {
        return Vec::new();
    }

    let filter = format!(
        "select='gt(scene,{SCENE_CHANGE_THRESHOLD})',showinfo",
    );

    let mut child = match Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-nostats",
            "-i",
            &input.to_string_lossy(),
            "-t",
            &horizon.to_string(),
            "-vf",
            &filter,
            "-f",
            "null",
            "-",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!(error = %e, "scene change extraction: failed to spawn ffmpeg");
            return Vec::new();
        }
    };

    let stderr = match child.stderr.take() {
        Some(s) => s,
        None => return Vec::new(),
    };
    let mut lines = BufReader::new(stderr).lines();
    let mut changes = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        if !line.contains("Parsed_showinfo") {
            continue;
        }
        if let Some(pts) = scrape_field(&line, "pts_time").and_then(|v| v.parse::<f64>().ok()) {
            changes.push(pts);
        }
    }

    let _ = child.wait().await;
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_configured_value() {
        assert!((SCENE_CHANGE_THRESHOLD - 0.45).abs() < 1e-9);
    }
}
