//! Storage seams
//!
//! The workflow only talks to these traits. Two backends implement them:
//! [`super::memory::MemoryStore`] and the SurrealDB repositories in
//! [`super::repository`].

use async_trait::async_trait;
use shared::models::{BuyerProfile, Cart, Order, OrderStatus, Product, Settlement, Transaction};
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Product stock
///
/// Every stock change also refreshes `available = stock > 0`.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>>;

    /// Insert or replace a product record
    async fn save_product(&self, product: &Product) -> StoreResult<()>;

    /// Atomically decrement stock if at least `quantity` is left.
    ///
    /// Returns the new stock, or `None` when the product is missing or short.
    async fn reserve(&self, product_id: &str, quantity: i64) -> StoreResult<Option<i64>>;

    /// Decrement unconditionally; stock may go negative
    async fn force_reserve(&self, product_id: &str, quantity: i64) -> StoreResult<i64>;

    /// Give stock back
    async fn release(&self, product_id: &str, quantity: i64) -> StoreResult<i64>;
}

/// One cart per buyer
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, buyer_id: &str) -> StoreResult<Option<Cart>>;

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()>;

    /// Empty the cart; no-op when the buyer has none
    async fn clear_cart(&self, buyer_id: &str) -> StoreResult<()>;
}

/// Order list filter
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.buyer_id.as_deref().is_none_or(|b| order.buyer_id == b)
            && self.seller_id.as_deref().is_none_or(|s| order.seller_id == s)
            && self.status.is_none_or(|s| order.status == s)
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Next value of the global order-number counter (starts at 1)
    async fn next_order_sequence(&self) -> StoreResult<u64>;

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Matching orders, newest first
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// Replace the stored order only if its version still equals `expected`.
    ///
    /// The caller bumps `order.version` before calling. Returns false when
    /// another writer got there first.
    async fn update_if_version(&self, order: &Order, expected: u64) -> StoreResult<bool>;
}

/// Payment attempt ledger
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert_transaction(&self, txn: &Transaction) -> StoreResult<()>;

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Transaction>>;

    async fn find_by_gateway_id(&self, gateway_id: &str) -> StoreResult<Option<Transaction>>;

    /// All attempts for an order, oldest first
    async fn list_for_order(&self, order_id: &str) -> StoreResult<Vec<Transaction>>;

    /// Write an outcome onto a transaction.
    ///
    /// A pending row takes any outcome; a failed row only a success. Returns
    /// false (and writes nothing) otherwise.
    async fn settle(&self, id: &str, settlement: &Settlement) -> StoreResult<bool>;
}

/// Read-only view of user accounts
#[async_trait]
pub trait BuyerDirectory: Send + Sync {
    async fn find_buyer(&self, id: &str) -> StoreResult<Option<BuyerProfile>>;

    async fn save_buyer(&self, profile: &BuyerProfile) -> StoreResult<()>;
}
