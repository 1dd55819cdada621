//! Order Model
//!
//! An order is created once from a cart snapshot. Its items and shipping
//! address are value copies; only status, payment bookkeeping and history
//! change afterwards.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::util::now_millis;

const DAY_MS: i64 = 86_400_000;
/// Delivery estimate once a delivery order is being prepared
pub const DELIVERY_ESTIMATE_DAYS: i64 = 3;
/// Pickup estimate once a pickup order is ready
pub const PICKUP_ESTIMATE_DAYS: i64 = 2;

/// Fulfillment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position along the fulfillment path
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Preparing => 2,
            Self::Ready => 3,
            Self::Delivered => 4,
            Self::Cancelled => 5,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Transition table
    ///
    /// - terminal states never move
    /// - `cancelled` is reachable from every non-terminal state
    /// - otherwise only strictly forward along
    ///   `pending → confirmed → preparing → ready → delivered`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status: `pending → paid | failed`, `paid → refunded`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Money was taken at some point; a refund does not reopen the payment
    pub const fn is_collected(&self) -> bool {
        matches!(self, Self::Paid | Self::Refunded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Settled outside the gateway; no asynchronous confirmation arrives
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::BankTransfer | Self::CashOnDelivery)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOption {
    #[default]
    Delivery,
    Pickup,
}

/// Shipping address snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub parish: String,
    #[serde(default)]
    pub postal_code: String,
}

impl ShippingAddress {
    /// Sentinel stored on pickup orders
    pub fn pickup() -> Self {
        Self {
            street: "Pickup".to_string(),
            city: "N/A".to_string(),
            parish: "N/A".to_string(),
            postal_code: "N/A".to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.parish, &self.postal_code]
            .iter()
            .all(|f| !f.trim().is_empty())
    }
}

/// Immutable line snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
    /// User id, or `system:<component>` for automatic transitions
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-readable `ORD-YYYY-NNNNNN`
    pub order_number: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub shipping_fee: f64,
    pub total: f64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub delivery_option: DeliveryOption,
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    /// Whether this order currently holds stock on its products
    pub stock_reserved: bool,
    /// Bumped on every write; writes are conditional on it
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Move to `next`, append one history entry and apply timestamp side effects.
    ///
    /// Returns false (and changes nothing) when the transition table forbids it.
    pub fn transition(&mut self, next: OrderStatus, actor: &str, notes: Option<String>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = now_millis();
        self.status = next;
        self.status_history.push(StatusHistoryEntry {
            status: next,
            timestamp: now,
            actor: actor.to_string(),
            notes,
        });

        match (next, self.delivery_option) {
            (OrderStatus::Delivered, _) => self.delivered_at = Some(now),
            (OrderStatus::Cancelled, _) => self.cancelled_at = Some(now),
            (OrderStatus::Preparing, DeliveryOption::Delivery) => {
                self.estimated_delivery = Some(now + DELIVERY_ESTIMATE_DAYS * DAY_MS)
            }
            (OrderStatus::Ready, DeliveryOption::Pickup) => {
                self.estimated_delivery = Some(now + PICKUP_ESTIMATE_DAYS * DAY_MS)
            }
            _ => {}
        }
        self.updated_at = now;
        true
    }

    pub fn is_party(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

// ========== Request payloads ==========

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    /// Inline address; takes precedence over `shipping_address_id`
    pub shipping_address: Option<ShippingAddress>,
    /// Id of one of the buyer's saved addresses
    pub shipping_address_id: Option<String>,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 128))]
    pub reference: Option<String>,
}

/// List query (`?status=&page=&limit=`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

// ========== Responses ==========

/// Redirect data for a card payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInit {
    pub payment_url: String,
    pub transaction_id: String,
    pub reference: String,
}

/// Result of order creation and payment retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInit>,
}

/// Tracking view of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTracking {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_option: DeliveryOption,
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
}

impl From<&Order> for OrderTracking {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            delivery_option: order.delivery_option,
            status_history: order.status_history.clone(),
            estimated_delivery: order.estimated_delivery,
            delivered_at: order.delivered_at,
            cancelled_at: order.cancelled_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub pagination: Pagination,
}
