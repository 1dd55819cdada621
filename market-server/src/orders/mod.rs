//! Order workflow
//!
//! Turns a buyer's cart into a persisted order, initiates payment and
//! reconciles payment outcomes arriving from the gateway.
//!
//! - **create**: cart → order → payment intent → stock reservation
//! - **reconcile**: client verification, signed webhooks, retry and offline confirmation
//! - **lifecycle**: cancellation and seller status updates
//! - **query**: order views for buyers and sellers
//!
//! # Consistency
//!
//! Every store call is atomic on its own document, but a workflow step spans
//! several documents and is not transactional. Order writes are
//! compare-and-set on `Order::version`, so the `already paid` and
//! `stock_reserved` guards flip exactly once; side effects run only in the
//! caller whose write won.
//!
//! ```text
//! create:  validate → persist(pending) → gateway → reserve → (offline) clear cart
//! payment: CAS(paid, confirmed) → settle txn → reserve if needed → clear cart
//! cancel:  CAS(cancelled) → release if held
//! ```

pub mod create;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod reconcile;
pub mod shipping;
mod stock;

use std::str::FromStr;
use std::sync::Arc;

use shared::models::{Order, PaymentMethod};
use shared::util::now_millis;

use crate::db::Stores;
use crate::payment::GatewayClient;

pub use error::{OrderError, OrderResult};
pub use reconcile::{WebhookAck, WebhookPayload};
pub use shipping::ShippingRates;

/// Maximum compare-and-set attempts for one order write
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Actor recorded for automatic payment transitions
pub const PAYMENT_ACTOR: &str = "system:payment";

/// Actor recorded when an order loses its stock to a concurrent order
pub const INVENTORY_ACTOR: &str = "system:inventory";

/// When stock is taken from the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationPoint {
    /// Right after the order and its payment record exist
    #[default]
    OrderCreated,
    /// Only once the payment is confirmed
    PaymentConfirmed,
}

impl FromStr for ReservationPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "order_created" => Ok(Self::OrderCreated),
            "payment_confirmed" => Ok(Self::PaymentConfirmed),
            other => Err(format!("unknown reservation point: {other}")),
        }
    }
}

/// 下单/对账策略
#[derive(Debug, Clone)]
pub struct WorkflowPolicy {
    /// 结算币种
    pub currency: String,
    /// 支付回跳地址前缀
    pub frontend_url: String,
    pub shipping: ShippingRates,
    pub card_reservation: ReservationPoint,
    pub offline_reservation: ReservationPoint,
    /// 线下支付下单后立即清空购物车
    pub clear_cart_on_offline_order: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            currency: "JMD".to_string(),
            frontend_url: "http://localhost:8081".to_string(),
            shipping: ShippingRates::default(),
            card_reservation: ReservationPoint::OrderCreated,
            offline_reservation: ReservationPoint::OrderCreated,
            clear_cart_on_offline_order: true,
        }
    }
}

impl WorkflowPolicy {
    pub fn reservation_point(&self, method: PaymentMethod) -> ReservationPoint {
        if method.is_offline() {
            self.offline_reservation
        } else {
            self.card_reservation
        }
    }

    pub fn return_url(&self, order_id: &str) -> String {
        format!(
            "{}/order-confirmation?orderId={}",
            self.frontend_url.trim_end_matches('/'),
            order_id
        )
    }

    pub fn cancel_url(&self) -> String {
        format!(
            "{}/checkout?cancelled=true",
            self.frontend_url.trim_end_matches('/')
        )
    }
}

/// Order workflow service
#[derive(Clone)]
pub struct OrderService {
    stores: Stores,
    gateway: Arc<dyn GatewayClient>,
    policy: WorkflowPolicy,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OrderService {
    pub fn new(stores: Stores, gateway: Arc<dyn GatewayClient>, policy: WorkflowPolicy) -> Self {
        Self {
            stores,
            gateway,
            policy,
        }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn gateway(&self) -> &Arc<dyn GatewayClient> {
        &self.gateway
    }

    pub(crate) async fn load_order(&self, order_id: &str) -> OrderResult<Order> {
        self.stores
            .orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Load, mutate, write back if the version is unchanged; retry otherwise.
    ///
    /// `mutate` returns `Ok(false)` to leave the order as stored. The result
    /// is the latest order and whether this call's write landed.
    pub(crate) async fn mutate_order<F>(
        &self,
        order_id: &str,
        mut mutate: F,
    ) -> OrderResult<(Order, bool)>
    where
        F: FnMut(&mut Order) -> OrderResult<bool>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut order = self.load_order(order_id).await?;
            let expected = order.version;
            if !mutate(&mut order)? {
                return Ok((order, false));
            }
            order.version = expected + 1;
            order.updated_at = now_millis();
            if self.stores.orders.update_if_version(&order, expected).await? {
                return Ok((order, true));
            }
            tracing::debug!(order_id, attempt, "Order version conflict, retrying");
        }
        tracing::error!(order_id, "Order write kept conflicting");
        Err(OrderError::Contention(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests;
