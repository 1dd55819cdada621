//! Cart Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::money;
use crate::util::now_millis;

/// One cart line with the price captured when it was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price snapshot
    pub price: f64,
    pub added_at: i64,
}

/// Per-buyer cart, keyed by buyer id
///
/// `subtotal` and `item_count` are derived from `items` and recomputed by
/// every mutating method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub buyer_id: String,
    pub items: Vec<CartItem>,
    pub subtotal: f64,
    pub item_count: i64,
    pub updated_at: i64,
}

impl Cart {
    pub fn new(buyer_id: impl Into<String>) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            items: Vec::new(),
            subtotal: 0.0,
            item_count: 0,
            updated_at: now_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add a line or merge into the existing one; the price snapshot is refreshed
    pub fn add_item(&mut self, product_id: &str, quantity: i64, price: f64) {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => {
                existing.quantity += quantity;
                existing.price = price;
            }
            None => self.items.push(CartItem {
                product_id: product_id.to_string(),
                quantity,
                price,
                added_at: now_millis(),
            }),
        }
        self.recompute();
    }

    /// Returns false when the product is not in the cart
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) else {
            return false;
        };
        item.quantity = quantity;
        self.recompute();
        true
    }

    /// Returns false when the product is not in the cart
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.recompute();
        }
        removed
    }

    /// Keep only lines matching the predicate; returns how many were dropped
    pub fn retain_items<F>(&mut self, f: F) -> usize
    where
        F: FnMut(&CartItem) -> bool,
    {
        let before = self.items.len();
        self.items.retain(f);
        let dropped = before - self.items.len();
        if dropped > 0 {
            self.recompute();
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    /// Re-derive `subtotal` and `item_count` from the items
    pub fn recompute(&mut self) {
        self.subtotal = money::sum_lines(self.items.iter().map(|i| (i.price, i.quantity)));
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
        self.updated_at = now_millis();
    }
}

/// Add item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCartItem {
    #[validate(length(min = 1, message = "product_id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, max = 9999, message = "quantity must be between 1 and 9999"))]
    pub quantity: i64,
}

/// Update item quantity payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCartItem {
    #[validate(range(min = 1, max = 9999, message = "quantity must be between 1 and 9999"))]
    pub quantity: i64,
}
