//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// How a failure should be treated by callers and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad or missing input, rejected before any mutation
    Validation,
    /// Operation conflicts with current state, rejected without mutation
    StateConflict,
    /// Referenced resource does not exist
    NotFound,
    /// Authentication or ownership failure
    Authorization,
    /// External payment provider failed or timed out
    Upstream,
    /// Storage or internal failure
    System,
}

impl ErrorCategory {
    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::StateConflict => "state_conflict",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Upstream => "upstream",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed
            | Self::InvalidAddress
            | Self::EmptyCart
            | Self::MultipleSellers
            | Self::ProductUnavailable
            | Self::InsufficientStock => ErrorCategory::Validation,

            Self::InvalidStatus | Self::InvalidStatusTransition => ErrorCategory::StateConflict,

            Self::NotFound
            | Self::OrderNotFound
            | Self::TransactionNotFound
            | Self::CartItemNotFound => ErrorCategory::NotFound,

            Self::Unauthorized
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::Forbidden
            | Self::InvalidSignature => ErrorCategory::Authorization,

            Self::PaymentInitFailed | Self::PaymentVerifyFailed => ErrorCategory::Upstream,

            Self::InternalError | Self::DatabaseError => ErrorCategory::System,
        }
    }
}
