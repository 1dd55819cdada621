//! Payment transaction ledger entry

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    /// Statuses a row may hold and still be settled to `self`.
    ///
    /// A confirmed success overrides an earlier failure; nothing overrides a
    /// success.
    pub const fn settleable_from(&self) -> &'static [TransactionStatus] {
        match self {
            Self::Success => &[Self::Pending, Self::Failed],
            Self::Failed => &[Self::Pending],
            Self::Pending => &[],
        }
    }
}

/// Who settles the payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateway {
    Wipay,
    BankTransfer,
    CashOnDelivery,
}

impl From<PaymentMethod> for PaymentGateway {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Card => Self::Wipay,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::CashOnDelivery => Self::CashOnDelivery,
        }
    }
}

/// One payment attempt for an order
///
/// Stored independently of the order. Only `status`, `metadata` and
/// `gateway_transaction_id` change: a pending row settles once, and a failed
/// row can still be upgraded to success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub order_id: String,
    pub buyer_id: String,
    pub amount: f64,
    pub currency: String,
    pub gateway: PaymentGateway,
    /// Gateway reference, or the order number for offline payments
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Terminal outcome written onto a pending transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub status: TransactionStatus,
    pub gateway_transaction_id: Option<String>,
    pub metadata: Value,
}

impl Transaction {
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}
