//! Shared types for the marketplace order service
//!
//! Error codes and the API envelope, domain models (product, cart, order,
//! transaction, buyer profile) and money helpers used by the server and by
//! API clients.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use axum::Json;
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
