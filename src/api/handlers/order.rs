use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::market_repo::MarketRepo;
use crate::db::order_repo::OrderRepo;
use crate::decimal::{validate_positive, AMOUNT_SCALE, PRICE_SCALE};
use crate::engine::{CancelError, MatchError};
use crate::models::{CancelOrderRequest, CreateOrderRequest, MarketState, OrderState, Trade};
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProcessedOrderResponse {
    pub order_id: i64,
    pub order_state: OrderState,
    pub filled_amount: rust_decimal::Decimal,
    pub remaining_amount: rust_decimal::Decimal,
    pub trades: Vec<Trade>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ProcessedOrderResponse>, AppError> {
    let market = MarketRepo::get_by_symbol(&state.db.pool, &req.target_market_symbol)
        .await?
        .ok_or_else(|| AppError::bad_request(&format!("market {} does not exist", req.target_market_symbol)))?;

    if market.state != MarketState::Active {
        return Err(AppError::bad_request("market is not accepting new orders"));
    }

    let price = validate_positive(req.price, PRICE_SCALE)
        .map_err(|e| AppError::bad_request(&e.to_string()))?;
    let amount = validate_positive(req.amount, AMOUNT_SCALE)
        .map_err(|e| AppError::bad_request(&e.to_string()))?;

    let mut tx = state.db.pool.begin().await?;
    let order = OrderRepo::create(&mut tx, market.id, req.order_type, req.order_side, price, amount).await?;

    let outcome = state
        .matching_engine
        .process_order_in_tx(&mut tx, order.id)
        .await
        .map_err(|e| match e {
            MatchError::OrderNotFound(id) => AppError::not_found(&format!("order {id} not found")),
            MatchError::NotWaiting(id) => AppError::bad_request(&format!("order {id} is not in waiting state")),
            MatchError::MarketNotFound(id) => AppError::bad_request(&format!("market {id} not found")),
            MatchError::Db(e) => AppError::from(e),
        })?;

    tx.commit().await?;
    state.matching_engine.sync_cache(&outcome).await;

    Ok(Json(ProcessedOrderResponse {
        order_id: outcome.order_id,
        order_state: outcome.order_state,
        filled_amount: outcome.filled_amount,
        remaining_amount: outcome.remaining_amount,
        trades: outcome.trades,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub order_id: i64,
    pub status: &'static str,
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>, AppError> {
    state.matching_engine.cancel_order(req.order_id).await.map_err(|e| match e {
        CancelError::OrderNotFound(id) => AppError::not_found(&format!("order {id} not found")),
        CancelError::WrongState(id) => {
            AppError::bad_request(&format!("order {id} cannot be canceled from its current state"))
        }
        CancelError::Db(e) => AppError::from(e),
    })?;

    Ok(Json(CancelOrderResponse {
        order_id: req.order_id,
        status: "canceled",
    }))
}
