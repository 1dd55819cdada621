//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查 (公共)
//! - [`orders`] - 订单接口
//! - [`cart`] - 购物车接口
//! - [`payments`] - 支付网关回调 (公共, 签名校验)
//!
//! 业务接口挂在 `/api/v1` 下；除 webhook 外都要求 Bearer JWT，由
//! [`CurrentUser`](crate::auth::CurrentUser) extractor 校验。

pub mod cart;
pub mod health;
pub mod orders;
pub mod payments;

use std::time::Duration;

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// API prefix
pub const API_PREFIX: &str = "/api/v1";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: "http_access",
        %method,
        %uri,
        status = response.status().as_u16(),
        request_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}

/// Business routes (without state)
pub fn routes() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(orders::router())
        .merge(cart::router())
        .merge(payments::router())
}

/// Full application with state and tower middleware
pub fn build_app(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    Router::new()
        .merge(health::router())
        .nest(API_PREFIX, routes())
        .with_state(state)
        // Tower HTTP 中间件 (后添加的先执行)
        .layer(middleware::from_fn(log_request))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
