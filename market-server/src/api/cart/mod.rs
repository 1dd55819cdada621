//! Cart API Module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Cart router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/cart", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::get).delete(handler::clear))
        .route("/items", post(handler::add_item))
        .route(
            "/items/{product_id}",
            put(handler::update_item).delete(handler::remove_item),
        )
}
