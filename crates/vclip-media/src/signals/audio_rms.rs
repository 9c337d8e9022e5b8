//! Per-second audio RMS energy, normalized to [0, 1].
//!
//! Runs `astats` with a one-second metadata window and scrapes
//! `pts_time:`/`RMS_level=` pairs off stderr, the same stderr-scraping shape
//! `silence_removal::analyze` uses for its own FFmpeg invocation.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use vclip_models::constants::{AUDIO_RMS_DB_CEIL, AUDIO_RMS_DB_FLOOR};

use super::{analysis_horizon, scrape_field};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioRmsSample {
    pub second: u32,
    /// `(clamp(rms, -60, 0) + 60) / 60`, in [0, 1].
    pub rms_normalized: f64,
}

/// Extract per-second audio energy. Best-effort: any failure yields `vec![]`.
pub async fn extract_audio_rms(input: &Path, duration_secs: f64) -> Vec<AudioRmsSample> {
    let horizon = analysis_horizon(duration_secs);
    if horizon <= 0.0 {
        return Vec::new();
    }

    let filter = "astats=metadata=1:reset=1,ametadata=print:key=lavfi.astats.Overall.RMS_level:file=-";

    let mut child = match Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-nostats",
            "-i",
            &input.to_string_lossy(),
            "-t",
            &horizon.to_string(),
            "-af",
            filter,
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
            debug!(error = %e, "audio RMS extraction: failed to spawn ffmpeg");
            return Vec::new();
        }
    };

    let stderr = match child.stderr.take() {
        Some(s) => s,
        None => return Vec::new(),
    };
    let mut lines = BufReader::new(stderr).lines();

    let mut buckets: Vec<Option<f64>> = vec![None; horizon.ceil() as usize + 1];
    let mut pending_pts: Option<f64> = None;

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(pts) = scrape_field(&line, "pts_time").and_then(|v| v.parse::<f64>().ok()) {
            pending_pts = Some(pts);
        }
        if let Some(rms) = scrape_field(&line, "RMS_level").and_then(|v| v.parse::<f64>().ok()) {
            if let Some(pts) = pending_pts {
                let second = pts.floor() as usize;
                if let Some(slot) = buckets.get_mut(second) {
                    let normalized = ((rms.clamp(AUDIO_RMS_DB_FLOOR, AUDIO_RMS_DB_CEIL) - AUDIO_RMS_DB_FLOOR)
                        / (AUDIO_RMS_DB_CEIL - AUDIO_RMS_DB_FLOOR))
                        .clamp(0.0, 1.0);
                    *slot = Some(slot.map_or(normalized, |prev: f64| prev.max(normalized)));
                }
            }
        }
    }

    let _ = child.wait().await;

    buckets
        .into_iter()
        .enumerate()
        .filter_map(|(second, value)| {
            value.map(|rms_normalized| AudioRmsSample {
                second: second as u32,
                rms_normalized,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_db_into_unit_range() {
        let normalized = |db: f64| {
            ((db.clamp(AUDIO_RMS_DB_FLOOR, AUDIO_RMS_DB_CEIL) - AUDIO_RMS_DB_FLOOR)
                / (AUDIO_RMS_DB_CEIL - AUDIO_RMS_DB_FLOOR))
                .clamp(0.0, 1.0)
        };
        assert!((normalized(0.0) - 1.0).abs() < 1e-9);
        assert!((normalized(-60.0) - 0.0).abs() < 1e-9);
        assert!((normalized(-30.0) - 0.5).abs() < 1e-9);
        assert!((normalized(10.0) - 1.0).abs() < 1e-9);
        assert!((normalized(-100.0) - 0.0).abs() < 1e-9);
    }
}
