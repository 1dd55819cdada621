use shared::models::OrderStatus;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::StoreError;

/// Order workflow errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Buyer not found: {0}")]
    BuyerNotFound(String),

    #[error("A complete shipping address is required for delivery")]
    InvalidAddress,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product is not available: {0}")]
    ProductUnavailable(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("All items must be from the same seller")]
    MultipleSellers,

    #[error("Item not in cart: {0}")]
    CartItemNotFound(String),

    #[error("Payment initialization failed: {message}")]
    PaymentInitFailed {
        order_id: String,
        order_number: String,
        message: String,
    },

    #[error("Payment verification failed: {0}")]
    PaymentVerifyFailed(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Order {0} was modified concurrently too many times")]
    Contention(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::BuyerNotFound(_) | OrderError::ProductNotFound(_) => ErrorCode::NotFound,
            OrderError::InvalidAddress => ErrorCode::InvalidAddress,
            OrderError::EmptyCart => ErrorCode::EmptyCart,
            OrderError::ProductUnavailable(_) => ErrorCode::ProductUnavailable,
            OrderError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            OrderError::MultipleSellers => ErrorCode::MultipleSellers,
            OrderError::CartItemNotFound(_) => ErrorCode::CartItemNotFound,
            OrderError::PaymentInitFailed { .. } => ErrorCode::PaymentInitFailed,
            OrderError::PaymentVerifyFailed(_) => ErrorCode::PaymentVerifyFailed,
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::Forbidden(_) => ErrorCode::Forbidden,
            OrderError::InvalidStatus(_) => ErrorCode::InvalidStatus,
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            OrderError::InvalidSignature => ErrorCode::InvalidSignature,
            OrderError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::Contention(_) => ErrorCode::InternalError,
            OrderError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        match err {
            OrderError::Storage(e) => {
                // Technical detail stays in the log
                tracing::error!(error = %e, "Storage error occurred");
                AppError::new(code)
            }
            OrderError::InsufficientStock {
                ref product_id,
                requested,
                available,
            } => AppError::with_message(code, err.to_string())
                .with_detail("product_id", product_id.clone())
                .with_detail("requested", requested)
                .with_detail("available", available),
            OrderError::PaymentInitFailed {
                ref order_id,
                ref order_number,
                ..
            } => AppError::with_message(code, err.to_string())
                .with_detail("order_id", order_id.clone())
                .with_detail("order_number", order_number.clone()),
            OrderError::ProductUnavailable(ref product_id) => {
                AppError::with_message(code, err.to_string())
                    .with_detail("product_id", product_id.clone())
            }
            other => AppError::with_message(code, other.to_string()),
        }
    }
}
