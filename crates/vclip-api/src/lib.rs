//! In-process submission surface for the retention-editing pipeline
//! (spec.md §6 "External Interfaces"): job `Enqueue`/`Cancel`, a realtime
//! progress `Publish` transport, and the ambient health/metrics endpoints.
//! HTTP authentication, billing, and video-platform-specific routes are
//! out of scope (spec.md §1).

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
