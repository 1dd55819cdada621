//! Cart service
//!
//! One cart per buyer. Lines carry a price snapshot that is refreshed
//! whenever the line is added to; stock is checked on every mutation but
//! only reserved once an order is placed.

use std::collections::HashSet;
use std::sync::Arc;

use shared::models::{Cart, Product};

use crate::db::{CartStore, InventoryStore, Stores};
use crate::orders::{OrderError, OrderResult};

#[derive(Clone)]
pub struct CartService {
    inventory: Arc<dyn InventoryStore>,
    carts: Arc<dyn CartStore>,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService").finish_non_exhaustive()
    }
}

impl CartService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            inventory: stores.inventory.clone(),
            carts: stores.carts.clone(),
        }
    }

    async fn load(&self, buyer_id: &str) -> OrderResult<Cart> {
        Ok(self
            .carts
            .find_cart(buyer_id)
            .await?
            .unwrap_or_else(|| Cart::new(buyer_id)))
    }

    async fn purchasable(&self, product_id: &str) -> OrderResult<Product> {
        let product = self
            .inventory
            .find_product(product_id)
            .await?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.to_string()))?;
        if !product.is_purchasable() {
            return Err(OrderError::ProductUnavailable(product_id.to_string()));
        }
        Ok(product)
    }

    /// Current cart; lines whose product is gone or unavailable are dropped
    pub async fn get_cart(&self, buyer_id: &str) -> OrderResult<Cart> {
        let mut cart = self.load(buyer_id).await?;

        let mut live = HashSet::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self.inventory.find_product(&item.product_id).await?;
            if product.is_some_and(|p| p.is_purchasable()) {
                live.insert(item.product_id.clone());
            }
        }

        let dropped = cart.retain_items(|i| live.contains(&i.product_id));
        if dropped > 0 {
            self.carts.save_cart(&cart).await?;
            tracing::info!(buyer_id, dropped, "Pruned unavailable cart lines");
        }
        Ok(cart)
    }

    /// Add to the cart, merging with an existing line
    pub async fn add_item(
        &self,
        buyer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> OrderResult<Cart> {
        let product = self.purchasable(product_id).await?;
        let mut cart = self.load(buyer_id).await?;

        let merged = cart.item(product_id).map_or(0, |i| i.quantity) + quantity;
        if merged > product.stock {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                requested: merged,
                available: product.stock,
            });
        }

        cart.add_item(product_id, quantity, product.price);
        self.carts.save_cart(&cart).await?;
        tracing::debug!(buyer_id, product_id, quantity = merged, "Cart line added");
        Ok(cart)
    }

    pub async fn update_item(
        &self,
        buyer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> OrderResult<Cart> {
        let mut cart = self.load(buyer_id).await?;
        if cart.item(product_id).is_none() {
            return Err(OrderError::CartItemNotFound(product_id.to_string()));
        }

        let product = self.purchasable(product_id).await?;
        if quantity > product.stock {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                requested: quantity,
                available: product.stock,
            });
        }

        cart.set_quantity(product_id, quantity);
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, buyer_id: &str, product_id: &str) -> OrderResult<Cart> {
        let mut cart = self.load(buyer_id).await?;
        if !cart.remove_item(product_id) {
            return Err(OrderError::CartItemNotFound(product_id.to_string()));
        }
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn clear_cart(&self, buyer_id: &str) -> OrderResult<()> {
        self.carts.clear_cart(buyer_id).await?;
        Ok(())
    }
}
