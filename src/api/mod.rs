//! HTTP API for the LMS
//!
//! Provides:
//! - JSON endpoints over the [`crate::services::Lms`] operations
//! - Bearer-token authentication
//! - Server-Sent Events (SSE) for real-time domain events

pub mod auth;
pub mod error;
pub mod events;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use events::{Event, EventBroadcaster, EventType};
pub use server::{router, ApiServer, ApiServerConfig, AppState};
