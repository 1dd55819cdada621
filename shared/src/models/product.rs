//! Product Model

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// Product entity as seen by the order workflow
///
/// `available` is a cached `stock > 0` signal. Order validation always
/// re-checks `stock` and never trusts the flag on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Owning seller (farmer) user id
    pub seller_id: String,
    pub title: String,
    /// Unit price in JMD
    pub price: f64,
    pub stock: i64,
    pub available: bool,
    /// Set by admin moderation; unapproved products cannot be bought
    pub approved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Approved product with `available` derived from `stock`
    pub fn new(
        id: impl Into<String>,
        seller_id: impl Into<String>,
        title: impl Into<String>,
        price: f64,
        stock: i64,
    ) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            seller_id: seller_id.into(),
            title: title.into(),
            price,
            stock,
            available: stock > 0,
            approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Can this product be put into a cart or an order at all
    pub fn is_purchasable(&self) -> bool {
        self.approved && self.available
    }

    /// Apply a stock delta and refresh the cached flag
    pub fn adjust_stock(&mut self, delta: i64) {
        self.stock += delta;
        self.available = self.stock > 0;
        self.updated_at = now_millis();
    }
}
