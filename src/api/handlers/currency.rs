use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::{Currency, CreateCurrencyRequest};
use crate::utils::response::AppError;
use crate::AppState;

pub async fn create_currency(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCurrencyRequest>,
) -> Result<Json<Currency>, AppError> {
    let currency = crate::db::currency_repo::CurrencyRepo::create(&state.db.pool, &req.name, &req.symbol)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::conflict("currency name or symbol already exists")
            }
            other => AppError::from(other),
        })?;

    Ok(Json(currency))
}

pub async fn list_currencies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Currency>>, AppError> {
    let currencies = crate::db::currency_repo::CurrencyRepo::list(&state.db.pool).await?;
    Ok(Json(currencies))
}
