//! Error codes surfaced by the marketplace API
//!
//! Codes travel over the wire as `SCREAMING_SNAKE_CASE` strings (`"EMPTY_CART"`),
//! and carry a numeric value for logs and metrics. Numeric ranges:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product / cart errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Request body or query failed validation
    ValidationFailed = 2,
    /// Generic resource not found
    NotFound = 3,
    /// Shipping address missing or incomplete
    InvalidAddress = 10,

    // ==================== 1xxx: Auth ====================
    /// Missing bearer token
    Unauthorized = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Caller does not own the resource
    Forbidden = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Buyer cart is empty
    EmptyCart = 4007,
    /// Cart spans more than one seller
    MultipleSellers = 4008,
    /// Operation not allowed in the current order status
    InvalidStatus = 4010,
    /// Requested fulfillment status is not reachable
    InvalidStatusTransition = 4011,

    // ==================== 5xxx: Payment ====================
    /// Gateway refused or failed to create a payment
    PaymentInitFailed = 5001,
    /// Gateway verification call failed
    PaymentVerifyFailed = 5002,
    /// Webhook signature mismatch
    InvalidSignature = 5003,
    /// No ledger entry for the reference
    TransactionNotFound = 5004,

    // ==================== 6xxx: Product / Cart ====================
    /// Product missing, unapproved or unavailable
    ProductUnavailable = 6001,
    /// Not enough stock for the requested quantity
    InsufficientStock = 6003,
    /// Product is not in the cart
    CartItemNotFound = 6101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Storage failure
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Numeric value of this code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Wire name, identical to the serde representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
            ErrorCode::EmptyCart => "EMPTY_CART",
            ErrorCode::MultipleSellers => "MULTIPLE_SELLERS",
            ErrorCode::InvalidStatus => "INVALID_STATUS",
            ErrorCode::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            ErrorCode::PaymentInitFailed => "PAYMENT_INIT_FAILED",
            ErrorCode::PaymentVerifyFailed => "PAYMENT_VERIFY_FAILED",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::ProductUnavailable => "PRODUCT_UNAVAILABLE",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::CartItemNotFound => "CART_ITEM_NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidAddress => "A complete shipping address is required for delivery",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::Forbidden => "You are not allowed to access this resource",
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::EmptyCart => "Cart is empty",
            ErrorCode::MultipleSellers => "All items in an order must come from the same seller",
            ErrorCode::InvalidStatus => "Operation not allowed in the current order status",
            ErrorCode::InvalidStatusTransition => "Invalid status transition",
            ErrorCode::PaymentInitFailed => "Failed to initialize payment",
            ErrorCode::PaymentVerifyFailed => "Failed to verify payment",
            ErrorCode::InvalidSignature => "Invalid webhook signature",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::ProductUnavailable => "Product is not available",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::CartItemNotFound => "Item not found in cart",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
