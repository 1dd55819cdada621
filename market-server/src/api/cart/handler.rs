//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{AddCartItem, Cart, UpdateCartItem};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult, ValidJson};

pub async fn get(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state.carts.get_cart(&user.id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn add_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<AddCartItem>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state
        .carts
        .add_item(&user.id, &payload.product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn update_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    ValidJson(payload): ValidJson<UpdateCartItem>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state
        .carts
        .update_item(&user.id, &product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn remove_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state.carts.remove_item(&user.id, &product_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn clear(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state.carts.clear_cart(&user.id).await?;
    Ok(Json(ApiResponse::ok("Cart cleared")))
}
