//! Payment reconciliation
//!
//! Client verification and gateway webhooks race each other for the same
//! transaction. Both funnel into [`OrderService::apply_success`] or
//! [`OrderService::apply_failure`], whose `already paid` guard is flipped by a
//! version-checked write; only the winner runs the side effects.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::models::{
    CreatedOrder, Order, OrderStatus, PaymentMethod, PaymentStatus, Settlement, Transaction,
    TransactionStatus,
};
use shared::money;

use super::{OrderError, OrderResult, OrderService, PAYMENT_ACTOR, ReservationPoint};
use crate::payment::is_success_status;

/// Webhook body as sent by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, alias = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Webhook acknowledgement body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl OrderService {
    /// Buyer asks us to check a card payment with the gateway
    pub async fn verify_payment(
        &self,
        order_id: &str,
        buyer_id: &str,
        reference: Option<String>,
    ) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.buyer_id != buyer_id {
            return Err(OrderError::Forbidden(
                "You can only verify payments for your own orders".into(),
            ));
        }
        if order.payment_status.is_collected() || order.payment_method.is_offline() {
            return Ok(order);
        }

        let reference = reference
            .filter(|r| !r.trim().is_empty())
            .or_else(|| order.payment_reference.clone())
            .ok_or_else(|| OrderError::Validation("No payment reference to verify".into()))?;
        let txn = self
            .stores
            .transactions
            .find_by_reference(&reference)
            .await?
            .filter(|t| t.order_id == order.id)
            .ok_or_else(|| OrderError::TransactionNotFound(reference.clone()))?;

        let verified = self.gateway.verify_payment(&reference).await.map_err(|e| {
            tracing::warn!(
                order_id,
                reference = %reference,
                error = %e,
                "Payment verification failed"
            );
            OrderError::PaymentVerifyFailed(e.to_string())
        })?;

        let metadata = json!({ "source": "verification", "gateway": verified.metadata });
        if !amount_matches(&txn, verified.amount) {
            return self.apply_failure(&txn, with_reason(metadata, "amount_mismatch")).await;
        }
        if verified.is_success() {
            self.apply_success(&txn, verified.transaction_id, metadata)
                .await
        } else {
            self.apply_failure(&txn, metadata).await
        }
    }

    /// Signed gateway callback. The signature is checked before the body is parsed.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> OrderResult<WebhookAck> {
        let Some(signature) = signature.filter(|s| !s.trim().is_empty()) else {
            crate::security_log!("warn", "webhook_rejected", reason = "missing signature");
            return Err(OrderError::InvalidSignature);
        };
        if !self.gateway.verify_signature(payload, signature) {
            crate::security_log!("warn", "webhook_rejected", reason = "signature mismatch");
            return Err(OrderError::InvalidSignature);
        }

        let event: WebhookPayload = serde_json::from_slice(payload)
            .map_err(|e| OrderError::Validation(format!("Malformed webhook payload: {e}")))?;

        let txn = self.find_webhook_transaction(&event).await?.ok_or_else(|| {
            let key = event
                .reference
                .clone()
                .or_else(|| event.transaction_id.clone())
                .unwrap_or_default();
            tracing::warn!(reference = %key, "Webhook for unknown transaction");
            OrderError::TransactionNotFound(key)
        })?;

        let metadata = json!({
            "source": "webhook",
            "status": event.status,
            "amount": event.amount,
            "currency": event.currency,
            "gateway": event.metadata,
        });

        if !amount_matches(&txn, event.amount) {
            self.apply_failure(&txn, with_reason(metadata, "amount_mismatch"))
                .await?;
        } else if is_success_status(&event.status) {
            self.apply_success(&txn, event.transaction_id.clone(), metadata)
                .await?;
        } else {
            self.apply_failure(&txn, metadata).await?;
        }

        Ok(WebhookAck { received: true })
    }

    async fn find_webhook_transaction(
        &self,
        event: &WebhookPayload,
    ) -> OrderResult<Option<Transaction>> {
        if let Some(reference) = event.reference.as_deref().filter(|r| !r.is_empty())
            && let Some(txn) = self.stores.transactions.find_by_reference(reference).await?
        {
            return Ok(Some(txn));
        }
        if let Some(gateway_id) = event.transaction_id.as_deref().filter(|r| !r.is_empty()) {
            return Ok(self.stores.transactions.find_by_gateway_id(gateway_id).await?);
        }
        Ok(None)
    }

    /// Mark the order paid exactly once and run the follow-up side effects
    pub(crate) async fn apply_success(
        &self,
        txn: &Transaction,
        gateway_transaction_id: Option<String>,
        metadata: Value,
    ) -> OrderResult<Order> {
        let mut needs_stock = false;
        let (order, flipped) = self
            .mutate_order(&txn.order_id, |o| {
                if o.payment_status.is_collected() {
                    return Ok(false);
                }
                o.payment_status = PaymentStatus::Paid;
                o.payment_reference = Some(txn.reference.clone());
                if let Some(id) = gateway_transaction_id
                    .as_ref()
                    .or(txn.gateway_transaction_id.as_ref())
                {
                    o.gateway_transaction_id = Some(id.clone());
                }
                if o.status == OrderStatus::Cancelled {
                    needs_stock = false;
                    return Ok(true);
                }
                if o.status == OrderStatus::Pending {
                    o.transition(
                        OrderStatus::Confirmed,
                        PAYMENT_ACTOR,
                        Some("Payment confirmed".to_string()),
                    );
                }
                needs_stock = !o.stock_reserved;
                o.stock_reserved = true;
                Ok(true)
            })
            .await?;

        if !flipped {
            tracing::debug!(
                order_id = %order.id,
                reference = %txn.reference,
                "Payment already applied"
            );
            return Ok(order);
        }

        let settlement = Settlement {
            status: TransactionStatus::Success,
            gateway_transaction_id,
            metadata,
        };
        if !self.stores.transactions.settle(&txn.id, &settlement).await? {
            tracing::warn!(
                order_id = %order.id,
                reference = %txn.reference,
                "Paid order's transaction was already settled"
            );
        }

        crate::payment_audit!(
            "payment_succeeded",
            order_id = order.id.as_str(),
            order_number = order.order_number.as_str(),
            reference = txn.reference.as_str(),
            amount = txn.amount
        );

        if order.status == OrderStatus::Cancelled {
            tracing::warn!(
                order_id = %order.id,
                order_number = %order.order_number,
                reference = %txn.reference,
                "Payment received for a cancelled order; refund required"
            );
            return Ok(order);
        }

        if needs_stock {
            self.force_reserve_lines(&order).await;
        }
        if let Err(e) = self.stores.carts.clear_cart(&order.buyer_id).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to clear cart after payment");
        }

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            "Payment confirmed"
        );
        Ok(order)
    }

    /// Record a failed attempt; fulfillment status is left alone so the buyer can retry
    pub(crate) async fn apply_failure(
        &self,
        txn: &Transaction,
        metadata: Value,
    ) -> OrderResult<Order> {
        let (order, flipped) = self
            .mutate_order(&txn.order_id, |o| {
                // A stale attempt must not override a newer one
                let current = o
                    .payment_reference
                    .as_deref()
                    .is_none_or(|r| r == txn.reference);
                if o.payment_status != PaymentStatus::Pending || !current {
                    return Ok(false);
                }
                o.payment_status = PaymentStatus::Failed;
                Ok(true)
            })
            .await?;

        let settlement = Settlement {
            status: TransactionStatus::Failed,
            gateway_transaction_id: None,
            metadata,
        };
        let settled = self.stores.transactions.settle(&txn.id, &settlement).await?;

        if flipped || settled {
            crate::payment_audit!(
                "payment_failed",
                order_id = order.id.as_str(),
                reference = txn.reference.as_str(),
                amount = txn.amount
            );
        }
        Ok(order)
    }

    /// New gateway checkout for a card order whose payment failed or was abandoned
    pub async fn retry_payment(
        &self,
        order_id: &str,
        buyer_id: &str,
    ) -> OrderResult<CreatedOrder> {
        let order = self.load_order(order_id).await?;
        if order.buyer_id != buyer_id {
            return Err(OrderError::Forbidden(
                "You can only retry payments for your own orders".into(),
            ));
        }
        if order.payment_method != PaymentMethod::Card {
            return Err(OrderError::InvalidStatus(
                "Only card payments can be retried".into(),
            ));
        }
        if order.payment_status.is_collected() {
            return Err(OrderError::InvalidStatus("Order is already paid".into()));
        }
        if order.status.is_terminal() {
            return Err(OrderError::InvalidStatus(format!(
                "Cannot retry payment for a {} order",
                order.status
            )));
        }

        let buyer = self
            .stores
            .buyers
            .find_buyer(buyer_id)
            .await?
            .ok_or_else(|| OrderError::BuyerNotFound(buyer_id.to_string()))?;

        let (mut order, init) = self.open_card_payment(&order, &buyer).await?;
        if self.policy.reservation_point(order.payment_method) == ReservationPoint::OrderCreated {
            order = self.reserve_new_order(&order.id).await?;
        }
        Ok(CreatedOrder {
            order,
            payment: Some(init),
        })
    }

    /// Seller confirms a bank transfer or cash payment was received
    pub async fn confirm_offline_payment(
        &self,
        order_id: &str,
        seller_id: &str,
    ) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.seller_id != seller_id {
            return Err(OrderError::Forbidden(
                "Only the seller can confirm this payment".into(),
            ));
        }
        if !order.payment_method.is_offline() {
            return Err(OrderError::InvalidStatus(
                "Card payments are confirmed by the gateway".into(),
            ));
        }
        if order.payment_status.is_collected() {
            return Ok(order);
        }
        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidStatus("Order is cancelled".into()));
        }

        let txn = self
            .stores
            .transactions
            .list_for_order(&order.id)
            .await?
            .into_iter()
            .rev()
            .find(|t| t.is_pending())
            .ok_or_else(|| OrderError::TransactionNotFound(order.order_number.clone()))?;

        self.apply_success(
            &txn,
            None,
            json!({ "source": "seller_confirmation", "confirmed_by": seller_id }),
        )
        .await
    }
}

/// A reported amount must match the ledger; a missing amount is accepted
fn amount_matches(txn: &Transaction, reported: Option<f64>) -> bool {
    match reported {
        None => true,
        Some(amount) if money::money_eq(amount, txn.amount) => true,
        Some(amount) => {
            tracing::warn!(
                order_id = %txn.order_id,
                reference = %txn.reference,
                expected = txn.amount,
                reported = amount,
                "Payment amount mismatch"
            );
            false
        }
    }
}

fn with_reason(mut metadata: Value, reason: &str) -> Value {
    if let Some(obj) = metadata.as_object_mut() {
        obj.insert("reason".to_string(), Value::from(reason));
    }
    metadata
}
