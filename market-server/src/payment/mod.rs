//! Payment gateway client
//!
//! [`GatewayClient`] is the seam the order workflow calls. [`WipayClient`]
//! talks to the hosted WiPay API over REST; tests substitute a fake.

pub mod signature;
pub mod wipay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use wipay::WipayClient;

const SANDBOX_API_URL: &str = "https://sandbox.wipay.com/v1";
const PRODUCTION_API_URL: &str = "https://api.wipay.com/v1";

/// 支付网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API 基础地址
    pub api_url: String,
    pub merchant_id: String,
    pub merchant_key: String,
    /// Bearer 密钥
    pub secret_key: String,
    /// Webhook HMAC 密钥
    pub webhook_secret: String,
    /// 请求超时 (毫秒)
    pub timeout_ms: u64,
}

impl GatewayConfig {
    pub fn default_api_url(sandbox: bool) -> &'static str {
        if sandbox {
            SANDBOX_API_URL
        } else {
            PRODUCTION_API_URL
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request timed out")]
    Timeout,

    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway client misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Payment intent request
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: String,
    /// Human-readable order number
    pub order_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// Hosted checkout created by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub transaction_id: String,
    pub payment_url: String,
    pub reference: String,
}

/// Gateway view of a payment
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub transaction_id: Option<String>,
    pub reference: String,
    /// Raw gateway status
    pub status: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    /// Full gateway response
    pub metadata: Value,
}

impl VerifiedPayment {
    /// `success` and `completed` both mean the money arrived
    pub fn is_success(&self) -> bool {
        is_success_status(&self.status)
    }
}

pub fn is_success_status(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "success" | "completed"
    )
}

/// Gateway operations used by the order workflow
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentIntent, GatewayError>;

    async fn verify_payment(&self, reference: &str) -> Result<VerifiedPayment, GatewayError>;

    /// Check a webhook signature against the raw request body
    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(is_success_status("success"));
        assert!(is_success_status("COMPLETED"));
        assert!(!is_success_status("failed"));
        assert!(!is_success_status("pending"));
    }

    #[test]
    fn test_default_api_url() {
        assert_eq!(GatewayConfig::default_api_url(true), SANDBOX_API_URL);
        assert_eq!(GatewayConfig::default_api_url(false), PRODUCTION_API_URL);
    }
}
