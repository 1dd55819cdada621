//! Unified error system for the marketplace service
//!
//! - [`ErrorCode`]: stable codes shown to clients (`"EMPTY_CART"`, ...)
//! - [`ErrorCategory`]: validation / state conflict / not found /
//!   authorization / upstream / system
//! - [`AppError`]: code + message + optional details
//! - [`ApiResponse`]: the `{success, data | error}` envelope
//!
//! # Example
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::PaymentInitFailed).with_detail("order_id", "abc");
//! let response = ApiResponse::<()>::error(&err);
//! assert!(!response.success);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{ApiResponse, AppError, AppResult, ErrorBody};
