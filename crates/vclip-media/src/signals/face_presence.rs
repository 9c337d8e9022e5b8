//! Per-second face presence via FFmpeg's `facedetect` filter, when the local
//! FFmpeg build exposes it. Falls back to an empty signal otherwise — face
//! presence is one input among eight into `EngagementModel`, never required.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use vclip_models::NormalizedRect;

use super::{analysis_horizon, scrape_field};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePresenceSample {
    pub second: u32,
    pub presence: f64,
    pub intensity: f64,
    pub center_x: f64,
    pub center_y: f64,
}

/// True if the local FFmpeg build lists the `facedetect` filter.
pub async fn facedetect_available() -> bool {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-filters"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains("facedetect"),
        Err(_) => false,
    }
}

/// Extract per-second face presence. Best-effort: `vec![]` on failure or when
/// `facedetect` isn't available.
pub async fn extract_face_presence(input: &Path, duration_secs: f64) -> Vec<FacePresenceSample> {
    if !facedetect_available().await {
        return Vec::new();
    }

    let horizon = analysis_horizon(duration_secs);
    if horizon <= 0.0 {
        return Vec::new();
    }

    let mut child = match Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-nostats",
            "-i",
            &input.to_string_lossy(),
            "-t",
            &horizon.to_string(),
            "-vf",
            "facedetect,showinfo",
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
            debug!(error = %e, "face presence extraction: failed to spawn ffmpeg");
            return Vec::new();
        }
    };

    let stderr = match child.stderr.take() {
        Some(s) => s,
        None => return Vec::new(),
    };
    let mut lines = BufReader::new(stderr).lines();

    // Accumulate area-weighted centroid per second across all boxes seen that second.
    let mut per_second: Vec<(f64, f64, f64, f64)> = vec![(0.0, 0.0, 0.0, 0.0); horizon.ceil() as usize + 1]; // (max_area, weighted_x, weighted_y, weight_sum)
    let mut pending_pts: Option<f64> = None;

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(pts) = scrape_field(&line, "pts_time").and_then(|v| v.parse::<f64>().ok()) {
            pending_pts = Some(pts);
        }
        if let Some(rect) = parse_face_box(&line) {
            if let Some(pts) = pending_pts {
                let second = pts.floor() as usize;
                if let Some(slot) = per_second.get_mut(second) {
                    let area = rect.width * rect.height;
                    let cx = rect.x + rect.width / 2.0;
                    let cy = rect.y + rect.height / 2.0;
                    slot.0 = slot.0.max(area);
                    slot.1 += cx * area;
                    slot.2 += cy * area;
                    slot.3 += area;
                }
            }
        }
    }

    let _ = child.wait().await;

    per_second
        .into_iter()
        .enumerate()
        .filter_map(|(second, (max_area, weighted_x, weighted_y, weight_sum))| {
            if weight_sum <= 0.0 {
                return None;
            }
            Some(FacePresenceSample {
                second: second as u32,
                presence: 1.0,
                intensity: max_area.clamp(0.0, 1.0),
                center_x: (weighted_x / weight_sum).clamp(0.0, 1.0),
                center_y: (weighted_y / weight_sum).clamp(0.0, 1.0),
            })
        })
        .collect()
}

/// Parse a `facedetect` box line (`x:123 y:45 w:67 h:67` in pixel or
/// normalized units depending on build) into a `NormalizedRect`. FFmpeg's
/// facedetect reports pixel coordinates; callers without the frame
/// dimensions fall back to treating the values as already-normalized when
/// they fall within [0, 1], otherwise skip the box rather than guess wrong.
fn parse_face_box(line: &str) -> Option<NormalizedRect> {
    if !line.contains("facedetect") {
        return None;
    }
    let x = scrape_field(line, "x")?.parse::<f64>().ok()?;
    let y = scrape_field(line, "y")?.parse::<f64>().ok()?;
    let w = scrape_field(line, "w")?.parse::<f64>().ok()?;
    let h = scrape_field(line, "h")?.parse::<f64>().ok()?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let rect = if x <= 1.0 && y <= 1.0 && w <= 1.0 && h <= 1.0 {
        NormalizedRect::new(x, y, w, h)
    } else {
        return None;
    };
    if rect.is_valid() {
        Some(rect)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_face_box_rejects_pixel_coordinates() {
        let line = "[Parsed_facedetect_0] x:120 y:80 w:60 h:60";
        assert!(parse_face_box(line).is_none());
    }

    #[test]
    fn parse_face_box_accepts_normalized_coordinates() {
        let line = "[Parsed_facedetect_0] x:0.2 y:0.1 w:0.3 h:0.3";
        let rect = parse_face_box(line).unwrap();
        assert!((rect.x - 0.2).abs() < 1e-9);
        assert!((rect.width - 0.3).abs() < 1e-9);
    }
}
