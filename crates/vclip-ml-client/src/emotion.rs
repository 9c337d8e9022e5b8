//! Client for the vocal-emotion classification sidecar (spec.md §4.4
//! `vocalExcitement`/`emotionIntensity` inputs, §6 `EMOTION_MODEL_BIN`).

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::MlResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionSample {
    pub second: u32,
    /// Energetic vocal delivery (laughter, excitement, raised pitch), in [0,1].
    pub vocal_excitement: f64,
    /// General emotional intensity of the speaker's voice, in [0,1].
    pub emotion_intensity: f64,
}

#[derive(Debug, Deserialize)]
struct EmotionResponseSample {
    second: u32,
    vocal_excitement: f64,
    emotion_intensity: f64,
}

#[derive(Debug, Deserialize)]
struct EmotionResponse {
    samples: Vec<EmotionResponseSample>,
}

/// Client for a local vocal-emotion classification sidecar.
pub struct EmotionClient {
    base_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl EmotionClient {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("EMOTION_MODEL_SIDECAR_URL").ok(),
            client: Client::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Best-effort: `vec![]` when unconfigured or on any failure.
    pub async fn classify(&self, audio_path: &Path) -> MlResult<Vec<EmotionSample>> {
        let Some(base_url) = &self.base_url else {
            return Ok(Vec::new());
        };

        let bytes = match tokio::fs::read(audio_path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to read audio for emotion classification");
                return Ok(Vec::new());
            }
        };

        let form = reqwest::multipart::Form::new()
            .part("audio", reqwest::multipart::Part::bytes(bytes).file_name("audio.wav"));

        let response = match self
            .client
            .post(format!("{base_url}/classify"))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "emotion sidecar request failed");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let parsed: EmotionResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "emotion sidecar returned malformed payload");
                return Ok(Vec::new());
            }
        };

        Ok(parsed
            .samples
            .into_iter()
            .map(|s| EmotionSample {
                second: s.second,
                vocal_excitement: s.vocal_excitement.clamp(0.0, 1.0),
                emotion_intensity: s.emotion_intensity.clamp(0.0, 1.0),
            })
            .collect())
    }
}
