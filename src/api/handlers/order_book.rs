use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::depth::DepthView;
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub market_symbol: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

pub async fn get_depth(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<DepthView>, AppError> {
    if query.limit == 0 || query.limit > 100 {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }

    let market = crate::db::market_repo::MarketRepo::get_by_symbol(&state.db.pool, &query.market_symbol)
        .await?
        .ok_or_else(|| AppError::bad_request(&format!("market {} does not exist", query.market_symbol)))?;

    let depth = state.depth_cache.get_depth(&market.symbol, query.limit).await;
    Ok(Json(depth))
}
