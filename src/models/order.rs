use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

/// The full set of states a wire-compatible `Order` may carry. The engine in
/// this crate only ever produces `Waiting`, `PartiallyFilled`, `Filled`,
/// `Canceled`, and `Error`; the remaining three variants exist purely as
/// serializable states for forward compatibility with callers that set
/// them out of band (balance checks, automated risk controls) — nothing in
/// this crate writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_state", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Waiting,
    Filled,
    PartiallyFilled,
    Canceled,
    Error,
    Idle,
    NotEnoughBalance,
    AutomaticallyCanceled,
}

impl OrderState {
    /// States from which the matching engine will still scan an order as a
    /// candidate resting order.
    pub fn is_restable(self) -> bool {
        matches!(self, OrderState::Waiting | OrderState::PartiallyFilled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Filled | OrderState::Canceled | OrderState::Error)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderState::Waiting => "waiting",
            OrderState::Filled => "filled",
            OrderState::PartiallyFilled => "partially_filled",
            OrderState::Canceled => "canceled",
            OrderState::Error => "error",
            OrderState::Idle => "idle",
            OrderState::NotEnoughBalance => "not_enough_balance",
            OrderState::AutomaticallyCanceled => "automatically_canceled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub target_market_id: i64,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
    pub filled_amount: Decimal,
    pub remaining_amount: Decimal,
    pub order_state: OrderState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub target_market_symbol: String,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub order_id: i64,
}
