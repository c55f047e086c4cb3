use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "market_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MarketState {
    Active,
    Suspend,
    Deactive,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketState::Active => write!(f, "active"),
            MarketState::Suspend => write!(f, "suspend"),
            MarketState::Deactive => write!(f, "deactive"),
        }
    }
}

/// A trading pair. `symbol` is derived from the two currencies at creation
/// time and never supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Market {
    pub id: i64,
    pub base_currency_id: i64,
    pub quote_currency_id: i64,
    pub symbol: String,
    pub fee: Decimal,
    pub state: MarketState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub base_currency_id: i64,
    pub quote_currency_id: i64,
    pub fee: Decimal,
}
