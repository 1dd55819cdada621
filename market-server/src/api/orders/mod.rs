//! Order API Module
//!
//! Buyers create, track, pay for and cancel their orders; sellers list the
//! orders for their products, move them along and confirm offline payments.

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list_for_buyer))
        .route("/seller", get(handler::list_for_seller))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/tracking", get(handler::track))
        .route("/{id}/verify-payment", post(handler::verify_payment))
        .route("/{id}/retry-payment", post(handler::retry_payment))
        .route("/{id}/confirm-payment", post(handler::confirm_payment))
        .route("/{id}/cancel", put(handler::cancel))
        .route("/{id}/status", put(handler::update_status))
}
