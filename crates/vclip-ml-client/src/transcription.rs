//! Client for the Whisper-family transcription sidecar (spec.md §4.3
//! "TRANSCRIBE" / §6 `WHISPER_SIDECAR_URL`).

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use vclip_models::TranscriptCue;

use crate::error::MlResult;

#[derive(Debug, Deserialize)]
struct TranscribeResponseCue {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    cues: Vec<TranscribeResponseCue>,
}

/// Client for a local Whisper-family transcription sidecar.
pub struct TranscriptionClient {
    base_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl TranscriptionClient {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("WHISPER_SIDECAR_URL").ok(),
            client: Client::new(),
            timeout: Duration::from_secs(
                std::env::var("WHISPER_SIDECAR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Transcribe the audio track at `audio_path`. Returns `vec![]` when the
    /// sidecar isn't configured or the call fails; transcription is an
    /// enrichment input to `EngagementWindow`, never a hard pipeline
    /// dependency (spec.md §4.4 lexical terms default to zero without it).
    pub async fn transcribe(&self, audio_path: &Path) -> MlResult<Vec<TranscriptCue>> {
        let Some(base_url) = &self.base_url else {
            return Ok(Vec::new());
        };

        let bytes = match tokio::fs::read(audio_path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to read audio for transcription");
                return Ok(Vec::new());
            }
        };

        let form = reqwest::multipart::Form::new().part(
            "audio",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(audio_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()),
        );

        let response = self
            .client
            .post(format!("{base_url}/transcribe"))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "transcription sidecar request failed");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "transcription sidecar returned non-success");
            return Ok(Vec::new());
        }

        let parsed: TranscribeResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "transcription sidecar returned malformed payload");
                return Ok(Vec::new());
            }
        };

        Ok(parsed
            .cues
            .into_iter()
            .map(|c| TranscriptCue::new(c.start, c.end, c.text))
            .collect())
    }
}
