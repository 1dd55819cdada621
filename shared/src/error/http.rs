//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::TransactionNotFound
            | Self::CartItemNotFound => StatusCode::NOT_FOUND,

            // 401 Unauthorized
            Self::Unauthorized
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::InvalidSignature => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::Forbidden => StatusCode::FORBIDDEN,

            // 502 Bad Gateway (payment provider failures)
            Self::PaymentInitFailed | Self::PaymentVerifyFailed => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation and state conflicts)
            Self::ValidationFailed
            | Self::InvalidAddress
            | Self::EmptyCart
            | Self::MultipleSellers
            | Self::InvalidStatus
            | Self::InvalidStatusTransition
            | Self::ProductUnavailable
            | Self::InsufficientStock => StatusCode::BAD_REQUEST,
        }
    }
}
