//! Per-line stock movements for an order

use shared::models::{Order, OrderItem};

use super::{OrderResult, OrderService};

/// A line that could not be reserved
#[derive(Debug, Clone)]
pub(crate) struct Shortfall {
    pub product_id: String,
    pub requested: i64,
    pub available: i64,
}

impl OrderService {
    /// Reserve every line conditionally.
    ///
    /// On the first short line, lines already taken are given back and the
    /// shortfall is returned.
    pub(crate) async fn reserve_lines(
        &self,
        items: &[OrderItem],
    ) -> OrderResult<Option<Shortfall>> {
        let mut taken: Vec<&OrderItem> = Vec::with_capacity(items.len());
        for item in items {
            match self.stores.inventory.reserve(&item.product_id, item.quantity).await {
                Ok(Some(_)) => taken.push(item),
                Ok(None) => {
                    let available = self
                        .stores
                        .inventory
                        .find_product(&item.product_id)
                        .await
                        .ok()
                        .flatten()
                        .map(|p| p.stock)
                        .unwrap_or(0);
                    self.release_items(taken).await;
                    return Ok(Some(Shortfall {
                        product_id: item.product_id.clone(),
                        requested: item.quantity,
                        available,
                    }));
                }
                Err(e) => {
                    self.release_items(taken).await;
                    return Err(e.into());
                }
            }
        }
        Ok(None)
    }

    /// Reserve every line, falling back to an unconditional decrement.
    ///
    /// Used once money has been taken: the sale stands even if stock ran out.
    pub(crate) async fn force_reserve_lines(&self, order: &Order) {
        for item in &order.items {
            let reserved = match self
                .stores
                .inventory
                .reserve(&item.product_id, item.quantity)
                .await
            {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    self.stores
                        .inventory
                        .force_reserve(&item.product_id, item.quantity)
                        .await
                }
                Err(e) => Err(e),
            };
            match reserved {
                Ok(stock) => tracing::warn!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    stock,
                    "Oversell: paid order reserved beyond available stock"
                ),
                Err(e) => tracing::error!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    error = %e,
                    "Failed to reserve stock for paid order"
                ),
            }
        }
    }

    /// Give back every line of an order
    pub(crate) async fn release_lines(&self, order: &Order) {
        self.release_items(order.items.iter().collect()).await;
    }

    async fn release_items(&self, items: Vec<&OrderItem>) {
        for item in items {
            if let Err(e) = self
                .stores
                .inventory
                .release(&item.product_id, item.quantity)
                .await
            {
                tracing::error!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "Failed to release stock"
                );
            }
        }
    }
}
