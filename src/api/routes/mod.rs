use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/currency/",
            post(handlers::currency::create_currency).get(handlers::currency::list_currencies),
        )
        .route(
            "/market/",
            post(handlers::market::create_market).get(handlers::market::list_markets),
        )
        .route("/order/", post(handlers::order::create_order))
        .route("/order/", patch(handlers::order::cancel_order))
        .route("/order-book/", get(handlers::order_book::get_depth))
}
