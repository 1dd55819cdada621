//! Payment gateway callbacks
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /payments/webhook | POST | WiPay 回调 | HMAC 签名 (`x-wipay-signature`) |
//!
//! The raw body is taken as bytes so the signature is checked against
//! exactly what the gateway signed.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::core::ServerState;
use crate::orders::WebhookAck;
use crate::payment::signature::SIGNATURE_HEADER;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/payments/webhook", post(webhook))
}

async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let ack = state.orders.handle_webhook(&body, signature).await?;
    Ok(Json(ack))
}
