//! In-memory backend
//!
//! DashMap shards give per-key locking, so `reserve`, `settle` and
//! `update_if_version` are atomic per record just like the database backend.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::models::{BuyerProfile, Cart, Order, Product, Settlement, Transaction};
use shared::util::now_millis;

use super::store::{
    BuyerDirectory, CartStore, InventoryStore, OrderFilter, OrderStore, StoreError, StoreResult,
    TransactionStore,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    products: DashMap<String, Product>,
    carts: DashMap<String, Cart>,
    orders: DashMap<String, Order>,
    transactions: DashMap<String, Transaction>,
    buyers: DashMap<String, BuyerProfile>,
    order_sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<i64> {
        let mut product = self
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
        product.adjust_stock(delta);
        Ok(product.stock)
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.get(id).map(|p| p.clone()))
    }

    async fn save_product(&self, product: &Product) -> StoreResult<()> {
        self.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn reserve(&self, product_id: &str, quantity: i64) -> StoreResult<Option<i64>> {
        let Some(mut product) = self.products.get_mut(product_id) else {
            return Ok(None);
        };
        if product.stock < quantity {
            return Ok(None);
        }
        product.adjust_stock(-quantity);
        Ok(Some(product.stock))
    }

    async fn force_reserve(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.adjust_stock(product_id, -quantity)
    }

    async fn release(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.adjust_stock(product_id, quantity)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, buyer_id: &str) -> StoreResult<Option<Cart>> {
        Ok(self.carts.get(buyer_id).map(|c| c.clone()))
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        self.carts.insert(cart.buyer_id.clone(), cart.clone());
        Ok(())
    }

    async fn clear_cart(&self, buyer_id: &str) -> StoreResult<()> {
        if let Some(mut cart) = self.carts.get_mut(buyer_id) {
            cart.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn next_order_sequence(&self) -> StoreResult<u64> {
        Ok(self.order_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("order {}", order.id))),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(())
            }
        }
    }

    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.get(id).map(|o| o.clone()))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| filter.matches(o.value()))
            .map(|o| o.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_if_version(&self, order: &Order, expected: u64) -> StoreResult<bool> {
        let Some(mut stored) = self.orders.get_mut(&order.id) else {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        };
        if stored.version != expected {
            return Ok(false);
        }
        *stored = order.clone();
        Ok(true)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, txn: &Transaction) -> StoreResult<()> {
        self.transactions.insert(txn.id.clone(), txn.clone());
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Transaction>> {
        Ok(self
            .transactions
            .iter()
            .find(|t| t.reference == reference)
            .map(|t| t.value().clone()))
    }

    async fn find_by_gateway_id(&self, gateway_id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self
            .transactions
            .iter()
            .find(|t| t.gateway_transaction_id.as_deref() == Some(gateway_id))
            .map(|t| t.value().clone()))
    }

    async fn list_for_order(&self, order_id: &str) -> StoreResult<Vec<Transaction>> {
        let mut txns: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.order_id == order_id)
            .map(|t| t.value().clone())
            .collect();
        txns.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(txns)
    }

    async fn settle(&self, id: &str, settlement: &Settlement) -> StoreResult<bool> {
        let Some(mut txn) = self.transactions.get_mut(id) else {
            return Err(StoreError::NotFound(format!("transaction {id}")));
        };
        if !settlement.status.settleable_from().contains(&txn.status) {
            return Ok(false);
        }
        txn.status = settlement.status;
        if settlement.gateway_transaction_id.is_some() {
            txn.gateway_transaction_id = settlement.gateway_transaction_id.clone();
        }
        txn.metadata = settlement.metadata.clone();
        txn.updated_at = now_millis();
        Ok(true)
    }
}

#[async_trait]
impl BuyerDirectory for MemoryStore {
    async fn find_buyer(&self, id: &str) -> StoreResult<Option<BuyerProfile>> {
        Ok(self.buyers.get(id).map(|b| b.clone()))
    }

    async fn save_buyer(&self, profile: &BuyerProfile) -> StoreResult<()> {
        self.buyers.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}
