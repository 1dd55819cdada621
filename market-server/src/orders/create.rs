//! Order creation

use std::collections::BTreeSet;

use chrono::Datelike;
use serde_json::json;
use shared::models::{
    BuyerProfile, CreateOrderRequest, CreatedOrder, DeliveryOption, Order, OrderItem, OrderStatus,
    PaymentGateway, PaymentInit, PaymentMethod, PaymentStatus, Settlement, ShippingAddress,
    StatusHistoryEntry, Transaction, TransactionStatus,
};
use shared::money;
use shared::util::{format_order_number, new_id, now_millis};

use super::stock::Shortfall;
use super::{INVENTORY_ACTOR, OrderError, OrderResult, OrderService, ReservationPoint};
use crate::payment::PaymentRequest;

/// Actor recorded when an order is cancelled for lack of stock

/// Pick the shipping address for an order
///
/// Pickup orders get the sentinel. Delivery orders use, in order: the inline
/// address (must be complete), the saved address named by id, the buyer's
/// default saved address.
pub fn resolve_address(
    buyer: &BuyerProfile,
    request: &CreateOrderRequest,
) -> OrderResult<ShippingAddress> {
    if request.delivery_option == DeliveryOption::Pickup {
        return Ok(ShippingAddress::pickup());
    }

    let address = if let Some(inline) = &request.shipping_address {
        inline.clone()
    } else if let Some(id) = &request.shipping_address_id {
        buyer
            .address(id)
            .map(ShippingAddress::from)
            .ok_or(OrderError::InvalidAddress)?
    } else {
        buyer
            .default_address()
            .map(ShippingAddress::from)
            .ok_or(OrderError::InvalidAddress)?
    };

    if !address.is_complete() {
        return Err(OrderError::InvalidAddress);
    }
    Ok(ShippingAddress {
        street: address.street.trim().to_string(),
        city: address.city.trim().to_string(),
        parish: address.parish.trim().to_string(),
        postal_code: address.postal_code.trim().to_string(),
    })
}

impl OrderService {
    /// Create an order from the buyer's cart and start its payment
    pub async fn create_order(
        &self,
        buyer_id: &str,
        request: CreateOrderRequest,
    ) -> OrderResult<CreatedOrder> {
        let buyer = self
            .stores
            .buyers
            .find_buyer(buyer_id)
            .await?
            .ok_or_else(|| OrderError::BuyerNotFound(buyer_id.to_string()))?;
        let shipping_address = resolve_address(&buyer, &request)?;

        let cart = self
            .stores
            .carts
            .find_cart(buyer_id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(OrderError::EmptyCart)?;

        // Fresh product state; cart flags are never trusted
        let mut items = Vec::with_capacity(cart.items.len());
        let mut sellers = BTreeSet::new();
        for line in &cart.items {
            let product = self
                .stores
                .inventory
                .find_product(&line.product_id)
                .await?
                .filter(|p| p.is_purchasable())
                .ok_or_else(|| OrderError::ProductUnavailable(line.product_id.clone()))?;
            if product.stock < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            sellers.insert(product.seller_id.clone());
            items.push(OrderItem {
                product_id: product.id,
                title: product.title,
                quantity: line.quantity,
                unit_price: line.price,
                line_total: money::line_total(line.price, line.quantity),
            });
        }
        if sellers.len() > 1 {
            return Err(OrderError::MultipleSellers);
        }
        let Some(seller_id) = sellers.pop_first() else {
            return Err(OrderError::EmptyCart);
        };

        let shipping_fee = self
            .policy
            .shipping
            .fee_for(request.delivery_option, &shipping_address);
        let subtotal = money::sum_lines(items.iter().map(|i| (i.unit_price, i.quantity)));
        let total = money::add(subtotal, shipping_fee);

        let sequence = self.stores.orders.next_order_sequence().await?;
        let order_number = format_order_number(chrono::Utc::now().year(), sequence);
        let method = request.payment_method;
        let now = now_millis();

        let order = Order {
            id: new_id(),
            order_number: order_number.clone(),
            buyer_id: buyer_id.to_string(),
            seller_id,
            items,
            subtotal,
            shipping_fee,
            total,
            currency: self.policy.currency.clone(),
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            payment_reference: method.is_offline().then(|| order_number.clone()),
            gateway_transaction_id: None,
            shipping_address,
            delivery_option: request.delivery_option,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                actor: buyer_id.to_string(),
                notes: Some("Order placed".to_string()),
            }],
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            estimated_delivery: None,
            delivered_at: None,
            cancelled_at: None,
            stock_reserved: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.stores.orders.insert_order(&order).await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            buyer_id,
            total = order.total,
            payment_method = ?method,
            "Order created"
        );

        let (mut order, payment) = match method {
            PaymentMethod::Card => {
                let (order, init) = self.open_card_payment(&order, &buyer).await?;
                (order, Some(init))
            }
            PaymentMethod::BankTransfer | PaymentMethod::CashOnDelivery => {
                self.record_offline_transaction(&order).await?;
                (order, None)
            }
        };

        if self.policy.reservation_point(method) == ReservationPoint::OrderCreated {
            order = self.reserve_new_order(&order.id).await?;
        }

        if method.is_offline()
            && self.policy.clear_cart_on_offline_order
            && let Err(e) = self.stores.carts.clear_cart(buyer_id).await
        {
            tracing::error!(buyer_id, error = %e, "Failed to clear cart after offline order");
        }

        Ok(CreatedOrder { order, payment })
    }

    /// Ask the gateway for a hosted checkout and record the pending attempt.
    ///
    /// On gateway failure the order is kept with `payment_status = failed`.
    pub(crate) async fn open_card_payment(
        &self,
        order: &Order,
        buyer: &BuyerProfile,
    ) -> OrderResult<(Order, PaymentInit)> {
        let request = PaymentRequest {
            amount: order.total,
            currency: order.currency.clone(),
            order_id: order.order_number.clone(),
            customer_email: buyer.email.clone(),
            customer_name: buyer.display_name.clone(),
            description: format!("Marketplace order {}", order.order_number),
            return_url: self.policy.return_url(&order.id),
            cancel_url: self.policy.cancel_url(),
        };

        let intent = match self.gateway.create_payment(&request).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    error = %e,
                    "Payment initialization failed"
                );
                self.mutate_order(&order.id, |o| {
                    if o.payment_status.is_collected() {
                        return Ok(false);
                    }
                    o.payment_status = PaymentStatus::Failed;
                    Ok(true)
                })
                .await?;
                return Err(OrderError::PaymentInitFailed {
                    order_id: order.id.clone(),
                    order_number: order.order_number.clone(),
                    message: e.to_string(),
                });
            }
        };

        let now = now_millis();
        let txn = Transaction {
            id: new_id(),
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            amount: order.total,
            currency: order.currency.clone(),
            gateway: PaymentGateway::Wipay,
            reference: intent.reference.clone(),
            gateway_transaction_id: Some(intent.transaction_id.clone()),
            status: TransactionStatus::Pending,
            metadata: json!({ "payment_url": intent.payment_url }),
            created_at: now,
            updated_at: now,
        };
        self.stores.transactions.insert_transaction(&txn).await?;

        let reference = intent.reference.clone();
        let (order, _) = self
            .mutate_order(&order.id, |o| {
                if o.payment_status.is_collected() {
                    return Ok(false);
                }
                o.payment_reference = Some(reference.clone());
                o.payment_status = PaymentStatus::Pending;
                Ok(true)
            })
            .await?;

        crate::payment_audit!(
            "payment_initiated",
            order_id = order.id.as_str(),
            reference = intent.reference.as_str(),
            amount = order.total
        );

        Ok((
            order,
            PaymentInit {
                payment_url: intent.payment_url,
                transaction_id: intent.transaction_id,
                reference: intent.reference,
            },
        ))
    }

    async fn record_offline_transaction(&self, order: &Order) -> OrderResult<()> {
        let now = now_millis();
        let txn = Transaction {
            id: new_id(),
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            amount: order.total,
            currency: order.currency.clone(),
            gateway: PaymentGateway::from(order.payment_method),
            reference: order.order_number.clone(),
            gateway_transaction_id: None,
            status: TransactionStatus::Pending,
            metadata: json!({ "payment_method": order.payment_method }),
            created_at: now,
            updated_at: now,
        };
        self.stores.transactions.insert_transaction(&txn).await?;
        Ok(())
    }

    /// Take stock line by line, then claim the reservation flag.
    ///
    /// The flag is only set once every line is held, so whoever sees it set
    /// (a cancel, say) may release every line. Losing the stock race cancels
    /// the order and fails its payment record.
    pub(crate) async fn reserve_new_order(&self, order_id: &str) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.stock_reserved || order.status == OrderStatus::Cancelled {
            return Ok(order);
        }

        if let Some(shortfall) = self.reserve_lines(&order.items).await? {
            if let Some(held) = self.abandon_for_stock(&order, &shortfall).await? {
                return Ok(held);
            }
            return Err(OrderError::InsufficientStock {
                product_id: shortfall.product_id,
                requested: shortfall.requested,
                available: shortfall.available,
            });
        }

        let claimed = self
            .mutate_order(order_id, |o| {
                if o.stock_reserved || o.status == OrderStatus::Cancelled {
                    return Ok(false);
                }
                o.stock_reserved = true;
                Ok(true)
            })
            .await;
        match claimed {
            Ok((order, true)) => Ok(order),
            Ok((latest, false)) => {
                // Cancelled or reserved elsewhere meanwhile; our lines go back
                self.release_lines(&order).await;
                Ok(latest)
            }
            Err(e) => {
                self.release_lines(&order).await;
                Err(e)
            }
        }
    }

    /// Cancel an order that could not get its stock.
    ///
    /// Returns the order unchanged when it already holds stock through
    /// another path (a confirmed payment), in which case the sale stands.
    async fn abandon_for_stock(
        &self,
        order: &Order,
        shortfall: &Shortfall,
    ) -> OrderResult<Option<Order>> {
        let note = format!(
            "Insufficient stock for {}: requested {}, available {}",
            shortfall.product_id, shortfall.requested, shortfall.available
        );
        let (cancelled, flipped) = self
            .mutate_order(&order.id, |o| {
                if o.stock_reserved || o.status.is_terminal() {
                    return Ok(false);
                }
                o.transition(OrderStatus::Cancelled, INVENTORY_ACTOR, Some(note.clone()));
                match o.payment_status {
                    PaymentStatus::Pending => o.payment_status = PaymentStatus::Failed,
                    PaymentStatus::Paid => o.payment_status = PaymentStatus::Refunded,
                    _ => {}
                }
                Ok(true)
            })
            .await?;
        if cancelled.stock_reserved {
            return Ok(Some(cancelled));
        }

        if flipped {
            if cancelled.payment_status == PaymentStatus::Refunded {
                tracing::warn!(
                    order_id = %cancelled.id,
                    order_number = %cancelled.order_number,
                    "Paid order cancelled for lack of stock; manual refund required"
                );
            }
            tracing::warn!(
                order_id = %order.id,
                order_number = %order.order_number,
                product_id = %shortfall.product_id,
                "Order cancelled: stock taken by a concurrent order"
            );
        }

        self.fail_pending_transactions(&order.id, "insufficient_stock").await;
        Ok(None)
    }

    /// Settle every still-pending attempt of an order as failed
    pub(crate) async fn fail_pending_transactions(&self, order_id: &str, reason: &str) {
        let txns = match self.stores.transactions.list_for_order(order_id).await {
            Ok(txns) => txns,
            Err(e) => {
                tracing::error!(order_id, error = %e, "Failed to load transactions");
                return;
            }
        };
        let settlement = Settlement {
            status: TransactionStatus::Failed,
            gateway_transaction_id: None,
            metadata: json!({ "reason": reason }),
        };
        for txn in txns.iter().filter(|t| t.is_pending()) {
            if let Err(e) = self.stores.transactions.settle(&txn.id, &settlement).await {
                tracing::error!(
                    order_id,
                    reference = %txn.reference,
                    error = %e,
                    "Failed to settle transaction"
                );
            }
        }
    }
}
