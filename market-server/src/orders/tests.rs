use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use shared::models::{
    BuyerProfile, Cart, CreateOrderRequest, DeliveryOption, Order, OrderStatus, PaymentMethod,
    PaymentStatus, Product, SavedAddress, ShippingAddress, TransactionStatus,
};

use super::query::PageRequest;
use super::*;
use crate::db::{InventoryStore, OrderFilter, StoreResult};
use crate::payment::{GatewayError, PaymentIntent, PaymentRequest, VerifiedPayment, signature};

const WEBHOOK_SECRET: &str = "whsec-test";

#[derive(Default)]
struct FakeGateway {
    fail_create: AtomicBool,
    created: AtomicU64,
    verify_calls: AtomicU64,
    verify_status: Mutex<String>,
    verify_amount: Mutex<Option<f64>>,
    /// Holds creators inside `create_payment` until all have arrived
    create_barrier: Option<tokio::sync::Barrier>,
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_payment(&self, _request: &PaymentRequest) -> Result<PaymentIntent, GatewayError> {
        if let Some(barrier) = &self.create_barrier {
            barrier.wait().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            transaction_id: format!("gw-{n}"),
            payment_url: format!("https://pay.test/checkout/{n}"),
            reference: format!("ref-{n}"),
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(VerifiedPayment {
            transaction_id: Some(format!("gw-{reference}")),
            reference: reference.to_string(),
            status: self.verify_status.lock().clone(),
            amount: *self.verify_amount.lock(),
            currency: Some("JMD".into()),
            metadata: json!({}),
        })
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(WEBHOOK_SECRET, payload, signature)
    }
}

struct Fixture {
    service: OrderService,
    stores: Stores,
    gateway: Arc<FakeGateway>,
}

fn buyer(id: &str) -> BuyerProfile {
    BuyerProfile {
        id: id.into(),
        email: format!("{id}@example.com"),
        display_name: format!("Buyer {id}"),
        addresses: vec![SavedAddress {
            id: "home".into(),
            street: "12 Hope Rd".into(),
            city: "Kingston".into(),
            parish: "St. Andrew".into(),
            postal_code: "JMAAW06".into(),
            is_default: true,
        }],
    }
}

async fn fixture_with(policy: WorkflowPolicy) -> Fixture {
    fixture_with_gateway(policy, FakeGateway::default()).await
}

async fn fixture_with_gateway(policy: WorkflowPolicy, gateway: FakeGateway) -> Fixture {
    let stores = Stores::memory();
    for id in ["b1", "b2"] {
        stores.buyers.save_buyer(&buyer(id)).await.unwrap();
    }
    for product in [
        Product::new("p1", "s1", "Yellow Yam", 1000.0, 10),
        Product::new("p2", "s1", "Scotch Bonnet", 250.0, 5),
        Product::new("p3", "s2", "Ackee", 800.0, 4),
    ] {
        stores.inventory.save_product(&product).await.unwrap();
    }
    let gateway = Arc::new(gateway);
    *gateway.verify_status.lock() = "success".into();
    let service = OrderService::new(stores.clone(), gateway.clone(), policy);
    Fixture {
        service,
        stores,
        gateway,
    }
}

async fn fixture() -> Fixture {
    fixture_with(WorkflowPolicy::default()).await
}

impl Fixture {
    async fn fill_cart(&self, buyer_id: &str, lines: &[(&str, i64)]) {
        let mut cart = Cart::new(buyer_id);
        for (product_id, qty) in lines {
            let product = self
                .stores
                .inventory
                .find_product(product_id)
                .await
                .unwrap()
                .unwrap();
            cart.add_item(product_id, *qty, product.price);
        }
        self.stores.carts.save_cart(&cart).await.unwrap();
    }

    async fn stock(&self, product_id: &str) -> i64 {
        self.stores
            .inventory
            .find_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn order(&self, id: &str) -> Order {
        self.stores.orders.find_order(id).await.unwrap().unwrap()
    }

    async fn card_order(&self, buyer_id: &str, lines: &[(&str, i64)]) -> Order {
        self.fill_cart(buyer_id, lines).await;
        self.service
            .create_order(buyer_id, request(PaymentMethod::Card))
            .await
            .unwrap()
            .order
    }

    async fn webhook(&self, body: serde_json::Value) -> OrderResult<WebhookAck> {
        let payload = serde_json::to_vec(&body).unwrap();
        let sig = signature::sign(WEBHOOK_SECRET, &payload);
        self.service.handle_webhook(&payload, Some(&sig)).await
    }
}

fn request(method: PaymentMethod) -> CreateOrderRequest {
    CreateOrderRequest {
        payment_method: method,
        delivery_option: DeliveryOption::Delivery,
        shipping_address: None,
        shipping_address_id: None,
        notes: None,
    }
}

fn confirmations(order: &Order) -> usize {
    order
        .status_history
        .iter()
        .filter(|h| h.status == OrderStatus::Confirmed)
        .count()
}

// ========== Creation ==========

#[tokio::test]
async fn test_card_order_reserves_stock_and_opens_payment() {
    let f = fixture().await;
    f.fill_cart("b1", &[("p1", 2)]).await;

    let created = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap();
    let order = created.order;
    let payment = created.payment.unwrap();

    assert_eq!(order.subtotal, 2000.0);
    assert_eq!(order.shipping_fee, 500.0);
    assert_eq!(order.total, 2500.0);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.payment_reference.as_deref(), Some("ref-1"));
    assert!(order.order_number.starts_with("ORD-"));
    assert!(order.stock_reserved);
    assert_eq!(payment.reference, "ref-1");
    assert_eq!(f.stock("p1").await, 8);

    let txns = f.stores.transactions.list_for_order(&order.id).await.unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].status, TransactionStatus::Pending);
    assert_eq!(txns[0].amount, 2500.0);

    // Card carts stay until the money arrives
    let cart = f.stores.carts.find_cart("b1").await.unwrap().unwrap();
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_remote_parish_and_pickup_fees() {
    let f = fixture().await;
    f.fill_cart("b1", &[("p2", 1)]).await;
    let mut req = request(PaymentMethod::CashOnDelivery);
    req.shipping_address = Some(ShippingAddress {
        street: "3 Harbour St".into(),
        city: "Port Antonio".into(),
        parish: "Portland".into(),
        postal_code: "JMCPT01".into(),
    });
    let order = f.service.create_order("b1", req).await.unwrap().order;
    assert_eq!(order.shipping_fee, 800.0);
    assert_eq!(order.total, 1050.0);

    f.fill_cart("b2", &[("p2", 1)]).await;
    let mut req = request(PaymentMethod::CashOnDelivery);
    req.delivery_option = DeliveryOption::Pickup;
    let order = f.service.create_order("b2", req).await.unwrap().order;
    assert_eq!(order.shipping_fee, 0.0);
    assert_eq!(order.shipping_address, ShippingAddress::pickup());
}

#[tokio::test]
async fn test_offline_order_clears_cart() {
    let f = fixture().await;
    f.fill_cart("b1", &[("p1", 1)]).await;

    let created = f
        .service
        .create_order("b1", request(PaymentMethod::BankTransfer))
        .await
        .unwrap();
    assert!(created.payment.is_none());
    let order = created.order;
    assert_eq!(order.payment_reference.as_deref(), Some(order.order_number.as_str()));
    assert_eq!(f.stock("p1").await, 9);

    let txn = f
        .stores
        .transactions
        .find_by_reference(&order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.order_id, order.id);

    let cart = f.stores.carts.find_cart("b1").await.unwrap().unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_creation_rejections_persist_nothing() {
    let f = fixture().await;

    let err = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));

    f.fill_cart("b1", &[("p1", 1), ("p3", 1)]).await;
    let err = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::MultipleSellers));

    f.fill_cart("b1", &[("p2", 6)]).await;
    let err = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InsufficientStock {
            requested: 6,
            available: 5,
            ..
        }
    ));

    let mut hidden = Product::new("p4", "s1", "Breadfruit", 300.0, 3);
    hidden.approved = false;
    f.stores.inventory.save_product(&hidden).await.unwrap();
    f.fill_cart("b1", &[("p4", 1)]).await;
    let err = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductUnavailable(_)));

    let err = f
        .service
        .create_order("ghost", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::BuyerNotFound(_)));

    let orders = f
        .stores
        .orders
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert!(orders.is_empty());
    assert_eq!(f.gateway.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gateway_failure_keeps_order_then_retry_succeeds() {
    let f = fixture().await;
    f.gateway.fail_create.store(true, Ordering::SeqCst);
    f.fill_cart("b1", &[("p1", 3)]).await;

    let err = f
        .service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap_err();
    let OrderError::PaymentInitFailed { order_id, .. } = err else {
        panic!("expected PaymentInitFailed, got {err:?}");
    };
    let order = f.order(&order_id).await;
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert!(!order.stock_reserved);
    assert_eq!(f.stock("p1").await, 10);

    f.gateway.fail_create.store(false, Ordering::SeqCst);
    let retried = f.service.retry_payment(&order_id, "b1").await.unwrap();
    assert_eq!(retried.order.payment_status, PaymentStatus::Pending);
    assert_eq!(retried.order.payment_reference.as_deref(), Some("ref-1"));
    assert!(retried.order.stock_reserved);
    assert_eq!(f.stock("p1").await, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_goes_to_exactly_one_order() {
    // Both creators pass validation before either reserves
    let gateway = FakeGateway {
        create_barrier: Some(tokio::sync::Barrier::new(2)),
        ..FakeGateway::default()
    };
    let f = fixture_with_gateway(WorkflowPolicy::default(), gateway).await;
    let last = Product::new("p9", "s1", "Last Pumpkin", 400.0, 1);
    f.stores.inventory.save_product(&last).await.unwrap();
    f.fill_cart("b1", &[("p9", 1)]).await;
    f.fill_cart("b2", &[("p9", 1)]).await;

    let a = {
        let service = f.service.clone();
        tokio::spawn(async move { service.create_order("b1", request(PaymentMethod::Card)).await })
    };
    let b = {
        let service = f.service.clone();
        tokio::spawn(async move { service.create_order("b2", request(PaymentMethod::Card)).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    let won = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(won, 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(OrderError::InsufficientStock { .. }))),
        "{results:?}"
    );
    assert_eq!(f.stock("p9").await, 0);

    // The loser's order is kept, cancelled, and its payment attempt failed
    let cancelled = f
        .stores
        .orders
        .list_orders(&OrderFilter {
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    let loser = &cancelled[0];
    assert!(!loser.stock_reserved);
    assert_eq!(loser.payment_status, PaymentStatus::Failed);
    assert_eq!(
        loser.status_history.last().map(|h| h.actor.as_str()),
        Some(INVENTORY_ACTOR)
    );
    let txns = f.stores.transactions.list_for_order(&loser.id).await.unwrap();
    assert!(txns.iter().all(|t| t.status == TransactionStatus::Failed));
}

/// Inventory that lets the buyer cancel while the first line is being taken
struct CancelDuringReserve {
    inner: Arc<dyn InventoryStore>,
    service: std::sync::OnceLock<OrderService>,
    armed: AtomicBool,
}

#[async_trait]
impl InventoryStore for CancelDuringReserve {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        self.inner.find_product(id).await
    }

    async fn save_product(&self, product: &Product) -> StoreResult<()> {
        self.inner.save_product(product).await
    }

    async fn reserve(&self, product_id: &str, quantity: i64) -> StoreResult<Option<i64>> {
        let taken = self.inner.reserve(product_id, quantity).await?;
        if self.armed.swap(false, Ordering::SeqCst)
            && let Some(service) = self.service.get()
        {
            let page = service
                .list_buyer_orders("b1", None, PageRequest::new(None, None))
                .await
                .unwrap();
            for order in page.items {
                service.cancel_order(&order.id, "b1").await.unwrap();
            }
        }
        Ok(taken)
    }

    async fn force_reserve(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.inner.force_reserve(product_id, quantity).await
    }

    async fn release(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.inner.release(product_id, quantity).await
    }
}

#[tokio::test]
async fn test_cancel_during_reservation_restores_stock_once() {
    let base = fixture().await;
    let hooked = Arc::new(CancelDuringReserve {
        inner: base.stores.inventory.clone(),
        service: std::sync::OnceLock::new(),
        armed: AtomicBool::new(false),
    });
    let mut stores = base.stores.clone();
    stores.inventory = hooked.clone();
    let service = OrderService::new(stores, base.gateway.clone(), WorkflowPolicy::default());
    let _ = hooked.service.set(service.clone());

    base.fill_cart("b1", &[("p1", 2), ("p2", 1)]).await;
    hooked.armed.store(true, Ordering::SeqCst);
    let created = service
        .create_order("b1", request(PaymentMethod::Card))
        .await
        .unwrap();

    let order = base.order(&created.order.id).await;
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(!order.stock_reserved);
    assert_eq!(base.stock("p1").await, 10);
    assert_eq!(base.stock("p2").await, 5);
}

#[tokio::test]
async fn test_payment_confirmed_reservation_defers_stock() {
    let policy = WorkflowPolicy {
        card_reservation: ReservationPoint::PaymentConfirmed,
        ..WorkflowPolicy::default()
    };
    let f = fixture_with(policy).await;
    let order = f.card_order("b1", &[("p1", 2)]).await;
    assert!(!order.stock_reserved);
    assert_eq!(f.stock("p1").await, 10);

    f.webhook(json!({ "reference": "ref-1", "status": "success", "amount": 2500.0 }))
        .await
        .unwrap();
    let order = f.order(&order.id).await;
    assert!(order.stock_reserved);
    assert_eq!(f.stock("p1").await, 8);
}

// ========== Reconciliation ==========

#[tokio::test]
async fn test_webhook_success_is_applied_once() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 2)]).await;
    let body = json!({
        "reference": "ref-1",
        "transactionId": "gw-1",
        "status": "success",
        "amount": 2500.0,
        "currency": "JMD"
    });

    let ack = f.webhook(body.clone()).await.unwrap();
    assert!(ack.received);
    let paid = f.order(&order.id).await;
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert_eq!(paid.gateway_transaction_id.as_deref(), Some("gw-1"));
    let last = paid.status_history.last().unwrap();
    assert_eq!(last.actor, PAYMENT_ACTOR);

    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Success);
    assert!(f.stores.carts.find_cart("b1").await.unwrap().unwrap().is_empty());

    // Redelivery
    assert!(f.webhook(body).await.unwrap().received);
    let again = f.order(&order.id).await;
    assert_eq!(again.version, paid.version);
    assert_eq!(confirmations(&again), 1);
    assert_eq!(f.stock("p1").await, 8);
}

#[tokio::test]
async fn test_webhook_rejections() {
    let f = fixture().await;
    f.card_order("b1", &[("p1", 1)]).await;
    let payload = br#"{"reference":"ref-1","status":"success"}"#;

    let err = f.service.handle_webhook(payload, None).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidSignature));

    let err = f
        .service
        .handle_webhook(payload, Some("deadbeef"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidSignature));

    let garbage = b"not json";
    let sig = signature::sign(WEBHOOK_SECRET, garbage);
    let err = f.service.handle_webhook(garbage, Some(&sig)).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));

    let err = f
        .webhook(json!({ "reference": "ref-404", "status": "success" }))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::TransactionNotFound(_)));
}

#[tokio::test]
async fn test_webhook_found_by_gateway_id() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;

    f.webhook(json!({ "transaction_id": "gw-1", "status": "completed" }))
        .await
        .unwrap();
    assert_eq!(f.order(&order.id).await.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_amount_mismatch_fails_payment() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 2)]).await;

    f.webhook(json!({ "reference": "ref-1", "status": "success", "amount": 1.0 }))
        .await
        .unwrap();
    let order = f.order(&order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.status, OrderStatus::Pending);

    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Failed);
    assert_eq!(txn.metadata["reason"], "amount_mismatch");
}

#[tokio::test]
async fn test_verify_payment_outcomes() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;

    let err = f.service.verify_payment(&order.id, "b2", None).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    *f.gateway.verify_status.lock() = "failed".into();
    let failed = f.service.verify_payment(&order.id, "b1", None).await.unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Failed);

    // New attempt, this time the gateway says paid
    f.service.retry_payment(&order.id, "b1").await.unwrap();
    *f.gateway.verify_status.lock() = "success".into();
    let paid = f.service.verify_payment(&order.id, "b1", None).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payment_reference.as_deref(), Some("ref-2"));
    assert_eq!(paid.status, OrderStatus::Confirmed);

    let calls = f.gateway.verify_calls.load(Ordering::SeqCst);
    let unchanged = f.service.verify_payment(&order.id, "b1", None).await.unwrap();
    assert_eq!(unchanged.version, paid.version);
    assert_eq!(f.gateway.verify_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_stale_failure_does_not_undo_payment() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;

    f.webhook(json!({ "reference": "ref-1", "status": "success" }))
        .await
        .unwrap();
    f.webhook(json!({ "reference": "ref-1", "status": "failed" }))
        .await
        .unwrap();

    let order = f.order(&order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_webhook_and_verify_confirm_once() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 2)]).await;

    let payload = serde_json::to_vec(&json!({ "reference": "ref-1", "status": "success" })).unwrap();
    let sig = signature::sign(WEBHOOK_SECRET, &payload);
    let hook = {
        let service = f.service.clone();
        tokio::spawn(async move { service.handle_webhook(&payload, Some(&sig)).await })
    };
    let verify = {
        let service = f.service.clone();
        let id = order.id.clone();
        tokio::spawn(async move { service.verify_payment(&id, "b1", None).await })
    };
    hook.await.unwrap().unwrap();
    verify.await.unwrap().unwrap();

    let order = f.order(&order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(confirmations(&order), 1);
    assert_eq!(f.stock("p1").await, 8);
}

#[tokio::test]
async fn test_payment_after_cancel_is_recorded_not_fulfilled() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 2)]).await;
    f.service.cancel_order(&order.id, "b1").await.unwrap();
    assert_eq!(f.stock("p1").await, 10);

    // The cancel failed the pending attempt; a late success still marks money received
    f.webhook(json!({ "reference": "ref-1", "status": "success" }))
        .await
        .unwrap();
    let order = f.order(&order.id).await;
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(f.stock("p1").await, 10);
}

#[tokio::test]
async fn test_redelivered_success_keeps_refund() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;
    let body = json!({ "reference": "ref-1", "status": "success" });
    f.webhook(body.clone()).await.unwrap();
    let cancelled = f.service.cancel_order(&order.id, "b1").await.unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

    f.webhook(body).await.unwrap();
    let order = f.order(&order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert_eq!(order.version, cancelled.version);

    let calls = f.gateway.verify_calls.load(Ordering::SeqCst);
    let verified = f.service.verify_payment(&order.id, "b1", None).await.unwrap();
    assert_eq!(verified.payment_status, PaymentStatus::Refunded);
    assert_eq!(f.gateway.verify_calls.load(Ordering::SeqCst), calls);

    let err = f.service.retry_payment(&order.id, "b1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));
    assert_eq!(f.stock("p1").await, 10);
}

#[tokio::test]
async fn test_late_success_overrides_failed_attempt() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;

    // Gateway still reports pending: recorded as a failed attempt
    *f.gateway.verify_status.lock() = "pending".into();
    let failed = f.service.verify_payment(&order.id, "b1", None).await.unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Failed);
    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Failed);

    f.webhook(json!({ "reference": "ref-1", "transaction_id": "gw-1", "status": "success" }))
        .await
        .unwrap();
    let order = f.order(&order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Confirmed);
    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Success);
}

#[tokio::test]
async fn test_retry_rules() {
    let f = fixture().await;
    f.fill_cart("b1", &[("p1", 1)]).await;
    let offline = f
        .service
        .create_order("b1", request(PaymentMethod::CashOnDelivery))
        .await
        .unwrap()
        .order;
    let err = f.service.retry_payment(&offline.id, "b1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));

    let card = f.card_order("b1", &[("p1", 1)]).await;
    let err = f.service.retry_payment(&card.id, "b2").await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    f.webhook(json!({ "reference": "ref-1", "status": "success" }))
        .await
        .unwrap();
    let err = f.service.retry_payment(&card.id, "b1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));
}

#[tokio::test]
async fn test_seller_confirms_offline_payment() {
    let f = fixture().await;
    f.fill_cart("b1", &[("p2", 2)]).await;
    let order = f
        .service
        .create_order("b1", request(PaymentMethod::BankTransfer))
        .await
        .unwrap()
        .order;

    let err = f.service.confirm_offline_payment(&order.id, "s2").await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let paid = f.service.confirm_offline_payment(&order.id, "s1").await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert_eq!(f.stock("p2").await, 3);

    let txn = f
        .stores
        .transactions
        .find_by_reference(&order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Success);
    assert_eq!(txn.metadata["confirmed_by"], "s1");

    let again = f.service.confirm_offline_payment(&order.id, "s1").await.unwrap();
    assert_eq!(again.version, paid.version);

    let card = f.card_order("b2", &[("p1", 1)]).await;
    let err = f.service.confirm_offline_payment(&card.id, "s1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));
}

// ========== Lifecycle ==========

#[tokio::test]
async fn test_buyer_cancel_releases_stock_once() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 4)]).await;
    assert_eq!(f.stock("p1").await, 6);

    let err = f.service.cancel_order(&order.id, "b2").await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let cancelled = f.service.cancel_order(&order.id, "b1").await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert!(!cancelled.stock_reserved);
    assert_eq!(f.stock("p1").await, 10);

    let txn = f.stores.transactions.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(txn.status, TransactionStatus::Failed);

    let err = f.service.cancel_order(&order.id, "b1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));
    assert_eq!(f.stock("p1").await, 10);
}

#[tokio::test]
async fn test_cancel_paid_order_marks_refund() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;
    f.webhook(json!({ "reference": "ref-1", "status": "success" }))
        .await
        .unwrap();

    let cancelled = f.service.cancel_order(&order.id, "b1").await.unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(f.stock("p1").await, 10);
}

#[tokio::test]
async fn test_seller_status_updates() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p1", 1)]).await;
    f.webhook(json!({ "reference": "ref-1", "status": "success" }))
        .await
        .unwrap();

    let err = f
        .service
        .update_status(&order.id, "s2", OrderStatus::Preparing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let preparing = f
        .service
        .update_status(&order.id, "s1", OrderStatus::Preparing, Some("packing".into()))
        .await
        .unwrap();
    assert_eq!(preparing.status, OrderStatus::Preparing);
    assert!(preparing.estimated_delivery.is_some());

    let err = f
        .service
        .update_status(&order.id, "s1", OrderStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Preparing,
            to: OrderStatus::Confirmed
        }
    ));

    let delivered = f
        .service
        .update_status(&order.id, "s1", OrderStatus::Delivered, None)
        .await
        .unwrap();
    assert!(delivered.delivered_at.is_some());

    let err = f.service.cancel_order(&order.id, "b1").await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidStatus(_)));
}

#[tokio::test]
async fn test_seller_cancel_goes_through_cancellation() {
    let f = fixture().await;
    let order = f.card_order("b1", &[("p2", 2)]).await;
    assert_eq!(f.stock("p2").await, 3);

    let cancelled = f
        .service
        .update_status(&order.id, "s1", OrderStatus::Cancelled, Some("out of season".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let last = cancelled.status_history.last().unwrap();
    assert_eq!(last.actor, "s1");
    assert_eq!(last.notes.as_deref(), Some("out of season"));
    assert_eq!(f.stock("p2").await, 5);
}

// ========== Queries ==========

#[tokio::test]
async fn test_order_visibility_and_listing() {
    let f = fixture().await;
    let first = f.card_order("b1", &[("p1", 1)]).await;
    f.card_order("b1", &[("p2", 1)]).await;
    f.card_order("b2", &[("p1", 1)]).await;

    assert!(f.service.get_order(&first.id, "b1").await.is_ok());
    assert!(f.service.get_order(&first.id, "s1").await.is_ok());
    let err = f.service.get_order(&first.id, "b2").await.unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));

    let page = f
        .service
        .list_buyer_orders("b1", None, PageRequest::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.pages, 2);

    let page = f
        .service
        .list_seller_orders("s1", Some(OrderStatus::Pending), PageRequest::new(None, None))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);

    let tracking = f.service.track_order(&first.id, "b1").await.unwrap();
    assert_eq!(tracking.order_number, first.order_number);
    assert_eq!(tracking.status_history.len(), 1);
}
