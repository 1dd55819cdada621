//! Order API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use shared::models::{
    CreateOrderRequest, CreatedOrder, Order, OrderListQuery, OrderPage, OrderTracking,
    UpdateOrderStatusRequest, VerifyPaymentRequest,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::query::PageRequest;
use crate::utils::{ApiResponse, AppResult, ValidJson, ValidQuery, parse_optional_body};

/// Create an order from the caller's cart
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedOrder>>)> {
    let created = state.orders.create_order(&user.id, payload).await?;
    let message = if created.payment.is_some() {
        "Order created, redirect to payment"
    } else {
        "Order created"
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(message, created)),
    ))
}

/// The caller's orders as a buyer
pub async fn list_for_buyer(
    State(state): State<ServerState>,
    user: CurrentUser,
    ValidQuery(query): ValidQuery<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderPage>>> {
    let page = state
        .orders
        .list_buyer_orders(&user.id, query.status, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Orders for the caller's products
pub async fn list_for_seller(
    State(state): State<ServerState>,
    user: CurrentUser,
    ValidQuery(query): ValidQuery<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderPage>>> {
    user.require_seller()?;
    let page = state
        .orders
        .list_seller_orders(&user.id, query.status, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.get_order(&id, &user.id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn track(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let tracking = state.orders.track_order(&id, &user.id).await?;
    Ok(Json(ApiResponse::success(tracking)))
}

/// Check a card payment with the gateway; the body (`{reference}`) is optional
pub async fn verify_payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    let request: VerifyPaymentRequest = parse_optional_body(&body)?;
    let order = state
        .orders
        .verify_payment(&id, &user.id, request.reference)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn retry_payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<CreatedOrder>>> {
    let created = state.orders.retry_payment(&id, &user.id).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// Seller marks a bank transfer or cash payment as received
pub async fn confirm_payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_seller()?;
    let order = state.orders.confirm_offline_payment(&id, &user.id).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Payment confirmed",
        order,
    )))
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.cancel_order(&id, &user.id).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Order cancelled",
        order,
    )))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_seller()?;
    let order = state
        .orders
        .update_status(&id, &user.id, payload.status, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
