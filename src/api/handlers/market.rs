use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::market_repo::{CreateMarketError, MarketRepo};
use crate::decimal::validate_fee;
use crate::models::{CreateMarketRequest, Market};
use crate::utils::response::AppError;
use crate::AppState;

pub async fn create_market(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<Json<Market>, AppError> {
    let fee = validate_fee(req.fee).map_err(|e| AppError::bad_request(&e.to_string()))?;

    let market = MarketRepo::create(&state.db.pool, req.base_currency_id, req.quote_currency_id, fee)
        .await
        .map_err(|e| match e {
            CreateMarketError::SameCurrency => {
                AppError::bad_request("cannot create a market with the same base and quote currency")
            }
            CreateMarketError::CurrencyNotFound(id) => {
                AppError::bad_request(&format!("currency {id} does not exist"))
            }
            CreateMarketError::Db(db_err) if matches!(&db_err, sqlx::Error::Database(d) if d.is_unique_violation()) => {
                AppError::conflict("a market for this currency pair already exists")
            }
            CreateMarketError::Db(db_err) => AppError::from(db_err),
        })?;

    Ok(Json(market))
}

pub async fn list_markets(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Market>>, AppError> {
    let markets = MarketRepo::list(&state.db.pool).await?;
    Ok(Json(markets))
}
