//! Clients for the optional Python ML sidecars that enrich the engagement
//! model beyond what `vclip-media`'s FFmpeg-based signal extractors can do
//! on their own: speech transcription, vocal-emotion classification, and
//! on-screen text density (OCR). Every client here is best-effort and
//! config-gated the same way `vclip-media::signals` is: when a sidecar URL
//! isn't configured, or the sidecar is unreachable, callers get back an
//! empty result rather than a hard failure, because none of these signals
//! are required to run the pipeline (spec.md §4.3/§4.4).

pub mod emotion;
pub mod error;
pub mod text_density;
pub mod transcription;

pub use emotion::{EmotionClient, EmotionSample};
pub use error::{MlError, MlResult};
pub use text_density::{TextDensityClient, TextDensitySample};
pub use transcription::TranscriptionClient;
