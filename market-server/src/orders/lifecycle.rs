//! Cancellation and seller status updates

use shared::models::{Order, OrderStatus, PaymentStatus};

use super::{OrderError, OrderResult, OrderService};

impl OrderService {
    /// Buyer cancels their own order
    pub async fn cancel_order(&self, order_id: &str, buyer_id: &str) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.buyer_id != buyer_id {
            return Err(OrderError::Forbidden(
                "You can only cancel your own orders".into(),
            ));
        }
        self.cancel(order_id, buyer_id, "Cancelled by buyer".to_string())
            .await
    }

    /// Seller moves an order along the fulfillment path
    pub async fn update_status(
        &self,
        order_id: &str,
        seller_id: &str,
        status: OrderStatus,
        notes: Option<String>,
    ) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.seller_id != seller_id {
            return Err(OrderError::Forbidden(
                "You can only update orders for your own products".into(),
            ));
        }

        if status == OrderStatus::Cancelled {
            let notes = notes.unwrap_or_else(|| "Cancelled by seller".to_string());
            return self.cancel(order_id, seller_id, notes).await;
        }

        let (order, _) = self
            .mutate_order(order_id, |o| {
                let from = o.status;
                if o.transition(status, seller_id, notes.clone()) {
                    Ok(true)
                } else {
                    Err(OrderError::InvalidTransition { from, to: status })
                }
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            "Order status updated"
        );
        Ok(order)
    }

    /// Cancel, then give back stock if this order held it.
    ///
    /// The terminal check and the flip happen in the same version-checked
    /// write, so a concurrent second cancel fails with `InvalidStatus`.
    async fn cancel(&self, order_id: &str, actor: &str, notes: String) -> OrderResult<Order> {
        let mut held_stock = false;
        let mut refunded = false;
        let (order, _) = self
            .mutate_order(order_id, |o| {
                if o.status.is_terminal() {
                    return Err(OrderError::InvalidStatus(format!(
                        "Cannot cancel an order that is {}",
                        o.status
                    )));
                }
                held_stock = o.stock_reserved;
                refunded = o.payment_status == PaymentStatus::Paid;
                o.transition(OrderStatus::Cancelled, actor, Some(notes.clone()));
                o.stock_reserved = false;
                if refunded {
                    o.payment_status = PaymentStatus::Refunded;
                }
                Ok(true)
            })
            .await?;

        if held_stock {
            self.release_lines(&order).await;
        }
        if refunded {
            tracing::warn!(
                order_id = %order.id,
                order_number = %order.order_number,
                amount = order.total,
                "Paid order cancelled; manual refund required"
            );
            crate::payment_audit!(
                "refund_required",
                order_id = order.id.as_str(),
                amount = order.total
            );
        }
        self.fail_pending_transactions(order_id, "order_cancelled")
            .await;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            actor,
            released = held_stock,
            "Order cancelled"
        );
        Ok(order)
    }
}
