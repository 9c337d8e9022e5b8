//! Object storage gateway for the retention-editing pipeline (spec.md §4.10).
//!
//! This crate provides:
//! - Dual-backend (primary + fallback) download/upload with retry
//! - Local-file fallback serving when both remote backends fail
//! - Presigned URL generation
//! - Secure delivery URLs (playback/download/share)

pub mod client;
pub mod delivery;
pub mod error;
pub mod gateway;

pub use client::R2Client;
pub use delivery::{DeliveryConfig, DeliveryScope, DeliveryToken, DeliveryUrl, DeliveryUrlGenerator};
pub use error::{StorageError, StorageResult};
pub use gateway::StorageGateway;
