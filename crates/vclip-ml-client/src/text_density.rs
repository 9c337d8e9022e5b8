//! Client for the on-screen-text (OCR) density sidecar (spec.md §4.4
//! `textDensity` input, §6 `TEXT_DENSITY_MODEL_URL`).

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::MlResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDensitySample {
    pub second: u32,
    /// Fraction of frame area covered by detected text, in [0,1].
    pub density: f64,
}

#[derive(Debug, Deserialize)]
struct TextDensityResponseSample {
    second: u32,
    density: f64,
}

#[derive(Debug, Deserialize)]
struct TextDensityResponse {
    samples: Vec<TextDensityResponseSample>,
}

/// Client for a local OCR-based text-density sidecar, fed pre-extracted
/// frames (`vclip_media::extract_frames`).
pub struct TextDensityClient {
    base_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl TextDensityClient {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TEXT_DENSITY_MODEL_URL").ok(),
            client: Client::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Best-effort: `vec![]` when unconfigured or on any failure. `frames`
    /// are paths produced by `vclip_media::extract_frames`, assumed named
    /// `frame_%06d.jpg` at `ANALYSIS_FRAME_FPS_DEFAULT`.
    pub async fn analyze_frames(&self, frames: &[std::path::PathBuf], fps: f64) -> MlResult<Vec<TextDensitySample>> {
        let Some(base_url) = &self.base_url else {
            return Ok(Vec::new());
        };
        if frames.is_empty() || fps <= 0.0 {
            return Ok(Vec::new());
        }

        let mut form = reqwest::multipart::Form::new();
        for (i, frame) in frames.iter().enumerate() {
            let bytes = match tokio::fs::read(frame).await {
                Ok(b) => b,
                Err(_) => continue,
            };
            form = form.part(format!("frame_{i}"), reqwest::multipart::Part::bytes(bytes).file_name(format!("frame_{i}.jpg")));
        }

        let response = match self
            .client
            .post(format!("{base_url}/analyze"))
            .timeout(self.timeout)
            .query(&[("fps", fps.to_string())])
            .multipart(form)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "text density sidecar request failed");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let parsed: TextDensityResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "text density sidecar returned malformed payload");
                return Ok(Vec::new());
            }
        };

        Ok(parsed
            .samples
            .into_iter()
            .map(|s| TextDensitySample {
                second: s.second,
                density: s.density.clamp(0.0, 1.0),
            })
            .collect())
    }
}
