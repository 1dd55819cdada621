//! Shared fixtures for the HTTP tests: an in-memory server with a fake gateway

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use market_server::auth::UserRole;
use market_server::db::Stores;
use market_server::payment::{
    GatewayClient, GatewayError, PaymentIntent, PaymentRequest, VerifiedPayment, signature,
};
use market_server::{Config, ServerState};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::models::{BuyerProfile, Product, SavedAddress};
use tower::ServiceExt;

/// Gateway double: sequential references, configurable verification result
#[derive(Default)]
pub struct FakeGateway {
    pub webhook_secret: String,
    pub fail_create: AtomicBool,
    pub created: AtomicU64,
    pub verify_status: Mutex<String>,
    pub requests: Mutex<Vec<PaymentRequest>>,
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentIntent, GatewayError> {
        self.requests.lock().push(request.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            transaction_id: format!("gw-{n}"),
            payment_url: format!("https://sandbox.test/pay/{n}"),
            reference: format!("ref-{n}"),
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        Ok(VerifiedPayment {
            transaction_id: None,
            reference: reference.to_string(),
            status: self.verify_status.lock().clone(),
            amount: None,
            currency: None,
            metadata: json!({ "source": "fake" }),
        })
    }

    fn verify_signature(&self, payload: &[u8], sig: &str) -> bool {
        signature::verify(&self.webhook_secret, payload, sig)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: ServerState,
    pub stores: Stores,
    pub gateway: Arc<FakeGateway>,
}

pub const BUYER: &str = "buyer-1";
pub const OTHER_BUYER: &str = "buyer-2";
pub const SELLER: &str = "farmer-1";

impl TestApp {
    pub async fn new() -> Self {
        Self::with_stores(Stores::memory()).await
    }

    /// Same seed data on top of the given stores
    pub async fn with_stores(stores: Stores) -> Self {
        let config = Config::for_tests();
        let gateway = Arc::new(FakeGateway {
            webhook_secret: config.gateway.webhook_secret.clone(),
            verify_status: Mutex::new("success".to_string()),
            ..FakeGateway::default()
        });

        for id in [BUYER, OTHER_BUYER] {
            stores
                .buyers
                .save_buyer(&BuyerProfile {
                    id: id.to_string(),
                    email: format!("{id}@example.com"),
                    display_name: id.to_string(),
                    addresses: vec![SavedAddress {
                        id: "a1".into(),
                        street: "5 Market St".into(),
                        city: "Mandeville".into(),
                        parish: "Manchester".into(),
                        postal_code: "JMCMN01".into(),
                        is_default: true,
                    }],
                })
                .await
                .unwrap();
        }
        stores
            .inventory
            .save_product(&Product::new("p1", SELLER, "Sweet Potato", 100.0, 3))
            .await
            .unwrap();
        stores
            .inventory
            .save_product(&Product::new("p2", "farmer-2", "Plantain", 50.0, 10))
            .await
            .unwrap();

        let state = ServerState::new(config, stores.clone(), gateway.clone());
        let router = market_server::api::build_app(state.clone());
        Self {
            router,
            state,
            stores,
            gateway,
        }
    }

    pub fn token(&self, user_id: &str, role: UserRole) -> String {
        self.state.jwt_service.generate_token(user_id, role).unwrap()
    }

    pub fn buyer_token(&self, user_id: &str) -> String {
        self.token(user_id, UserRole::Buyer)
    }

    pub fn seller_token(&self) -> String {
        self.token(SELLER, UserRole::Farmer)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    /// Post a raw webhook body, signed unless `sig` is given
    pub async fn webhook(&self, body: &[u8], sig: Option<&str>) -> (StatusCode, Value) {
        let signature = match sig {
            Some(s) => s.to_string(),
            None => signature::sign(&self.gateway.webhook_secret, body),
        };
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(signature::SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_vec()))
            .unwrap();
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn stock(&self, product_id: &str) -> i64 {
        self.stores
            .inventory
            .find_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}
