use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An immutable currency definition. Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Currency {
    pub id: i64,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCurrencyRequest {
    pub name: String,
    pub symbol: String,
}
