//! Errors for the ML sidecar clients.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("sidecar not configured: {0}")]
    NotConfigured(&'static str),

    #[error("sidecar request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("sidecar returned malformed payload: {0}")]
    InvalidResponse(String),
}
