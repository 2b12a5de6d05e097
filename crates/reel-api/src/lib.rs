//! HTTP and WebSocket API for Reelforge.
//!
//! Routes under `/api` cover the footage library, the script-to-schedule
//! director flow, rendering and trend research. `/ws/logs` streams every
//! pipeline log line to connected editors.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, StateParts};
