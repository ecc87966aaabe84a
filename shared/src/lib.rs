//! Shared types for the Payer ordering service
//!
//! Error codes and the response envelope, the menu and order data model, and
//! the realtime channel protocol used by the server and its clients.

pub mod error;
pub mod models;
pub mod realtime;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, ErrorCode};
