use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An executed trade. Append-only — no update or delete statement in this
/// crate ever targets the `trades` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: i64,
    pub maker_order_id: i64,
    pub taker_order_id: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub trade_market_id: i64,
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}
