//! The matching engine: a constructed service holding a `PgPool` and an
//! `Arc<DepthCache>`, not a singleton. `process_order` is the sole entry
//! point for intake; `cancel_order` is the sole entry point for
//! cancellation. Both run as one `sqlx` transaction with `SELECT ... FOR
//! UPDATE` locking: the incoming order row first, then opposing rows in
//! scan order.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::depth::DepthCache;
use crate::db::market_repo::MarketRepo;
use crate::db::order_repo::OrderRepo;
use crate::db::trade_repo::TradeRepo;
use crate::models::{Order, OrderSide, OrderState, OrderType, Trade};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("order {0} not found")]
    OrderNotFound(i64),
    #[error("order {0} is not in waiting state")]
    NotWaiting(i64),
    #[error("market {0} not found")]
    MarketNotFound(i64),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CancelError {
    #[error("order {0} not found")]
    OrderNotFound(i64),
    #[error("order {0} cannot be canceled from its current state")]
    WrongState(i64),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub order_id: i64,
    pub order_state: OrderState,
    pub filled_amount: Decimal,
    pub remaining_amount: Decimal,
    pub trades: Vec<Trade>,
    /// `true` when a market order found no opposing liquidity at all and
    /// was transitioned straight to `Error`.
    pub no_match: bool,
    market_symbol: String,
    /// Final post-trade state of every order touched by the match (the
    /// taker plus every maker consumed in the walk), for cache sync once
    /// the transaction has committed.
    touched: Vec<Order>,
}

pub struct MatchingEngine {
    pool: PgPool,
    depth_cache: Arc<DepthCache>,
}

impl MatchingEngine {
    pub fn new(pool: PgPool, depth_cache: Arc<DepthCache>) -> Self {
        Self { pool, depth_cache }
    }

    /// Runs intake end to end: opens its own transaction, matches, commits,
    /// then syncs the depth cache for every order touched.
    pub async fn process_order(&self, order_id: i64) -> Result<ProcessOutcome, MatchError> {
        let mut tx = self.pool.begin().await?;
        let outcome = self.match_locked(&mut tx, order_id).await?;
        tx.commit().await?;
        self.sync_cache(&outcome).await;
        Ok(outcome)
    }

    /// Matches `order_id` within a transaction the caller already holds
    /// open (e.g. one that also persisted the order's initial insert), so
    /// creation and matching commit atomically. The caller must commit the
    /// transaction and then call `sync_cache` with the returned outcome —
    /// the cache is never updated until the match is durably committed.
    pub async fn process_order_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<ProcessOutcome, MatchError> {
        self.match_locked(tx, order_id).await
    }

    /// Updates the depth cache for every order an outcome touched. Call
    /// only after the transaction that produced the outcome has committed.
    pub async fn sync_cache(&self, outcome: &ProcessOutcome) {
        for order in &outcome.touched {
            self.depth_cache.update(&outcome.market_symbol, order).await;
        }
    }

    async fn match_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<ProcessOutcome, MatchError> {
        let mut order = OrderRepo::get_for_update(tx, order_id)
            .await?
            .ok_or(MatchError::OrderNotFound(order_id))?;

        if order.order_state != OrderState::Waiting {
            return Err(MatchError::NotWaiting(order_id));
        }

        // normalize remaining_amount, as the original engine does at the
        // top of every process_order call
        order.remaining_amount = order.amount - order.filled_amount;

        let market = MarketRepo::get(&self.pool, order.target_market_id)
            .await?
            .ok_or(MatchError::MarketNotFound(order.target_market_id))?;

        let opposing = OrderRepo::find_matching_for_update(tx, order.target_market_id, order.order_side.opposite())
            .await?;

        let mut trades = Vec::new();
        let mut touched = Vec::new();

        for mut maker in opposing {
            if order.remaining_amount <= Decimal::ZERO {
                break;
            }

            if order.order_type == OrderType::Limit && !price_matches(&order, &maker) {
                break;
            }

            let matched_amount = order.remaining_amount.min(maker.remaining_amount);

            let trade = TradeRepo::create(
                tx,
                maker.id,
                order.id,
                maker.price,
                matched_amount,
                order.target_market_id,
                market.fee,
            )
            .await?;

            order.filled_amount += matched_amount;
            order.remaining_amount = order.amount - order.filled_amount;

            maker.filled_amount += matched_amount;
            maker.remaining_amount = maker.amount - maker.filled_amount;
            let maker_state = next_state(&maker);
            let maker_filled_at = if maker_state == OrderState::Filled {
                Some(Utc::now())
            } else {
                None
            };
            OrderRepo::update_amounts_and_state(
                tx,
                maker.id,
                maker.filled_amount,
                maker.remaining_amount,
                maker_state,
                maker_filled_at,
            )
            .await?;

            maker.order_state = maker_state;
            maker.filled_at = maker_filled_at;
            touched.push(maker);

            trades.push(trade);
        }

        let no_match = order.order_type == OrderType::Market && trades.is_empty();
        let final_state = if no_match {
            OrderState::Error
        } else {
            next_state(&order)
        };
        let filled_at = if final_state == OrderState::Filled {
            Some(Utc::now())
        } else {
            None
        };

        OrderRepo::update_amounts_and_state(
            tx,
            order.id,
            order.filled_amount,
            order.remaining_amount,
            final_state,
            filled_at,
        )
        .await?;

        let updated = Order {
            order_state: final_state,
            filled_at,
            ..order
        };
        touched.push(updated.clone());

        Ok(ProcessOutcome {
            order_id,
            order_state: final_state,
            filled_amount: updated.filled_amount,
            remaining_amount: updated.remaining_amount,
            trades,
            no_match,
            market_symbol: market.symbol,
            touched,
        })
    }

    pub async fn cancel_order(&self, order_id: i64) -> Result<(), CancelError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepo::get_for_update(&mut tx, order_id)
            .await?
            .ok_or(CancelError::OrderNotFound(order_id))?;

        if !order.order_state.is_restable() {
            return Err(CancelError::WrongState(order_id));
        }

        OrderRepo::update_amounts_and_state(
            &mut tx,
            order_id,
            order.filled_amount,
            order.remaining_amount,
            OrderState::Canceled,
            None,
        )
        .await?;

        tx.commit().await?;

        if let Ok(Some(market)) = MarketRepo::get(&self.pool, order.target_market_id).await {
            let canceled = Order {
                order_state: OrderState::Canceled,
                ..order
            };
            self.depth_cache.update(&market.symbol, &canceled).await;
        }

        Ok(())
    }
}

/// The buyer is willing to buy up to their own price; the seller is
/// willing to sell for at least their own price.
fn price_matches(taker: &Order, maker: &Order) -> bool {
    match taker.order_side {
        OrderSide::Buy => maker.price <= taker.price,
        OrderSide::Sell => maker.price >= taker.price,
    }
}

fn next_state(order: &Order) -> OrderState {
    if order.remaining_amount <= Decimal::ZERO {
        OrderState::Filled
    } else if order.filled_amount > Decimal::ZERO {
        OrderState::PartiallyFilled
    } else {
        OrderState::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_order(side: OrderSide, price: Decimal, amount: Decimal, filled: Decimal) -> Order {
        Order {
            id: 1,
            target_market_id: 1,
            order_type: OrderType::Limit,
            order_side: side,
            price,
            amount,
            filled_amount: filled,
            remaining_amount: amount - filled,
            order_state: OrderState::Waiting,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            filled_at: None,
        }
    }

    #[test]
    fn buyer_accepts_maker_at_or_below_limit() {
        let taker = sample_order(OrderSide::Buy, dec!(100), dec!(1), dec!(0));
        let maker = sample_order(OrderSide::Sell, dec!(99), dec!(1), dec!(0));
        assert!(price_matches(&taker, &maker));
    }

    #[test]
    fn buyer_rejects_maker_above_limit() {
        let taker = sample_order(OrderSide::Buy, dec!(100), dec!(1), dec!(0));
        let maker = sample_order(OrderSide::Sell, dec!(101), dec!(1), dec!(0));
        assert!(!price_matches(&taker, &maker));
    }

    #[test]
    fn seller_accepts_maker_at_or_above_limit() {
        let taker = sample_order(OrderSide::Sell, dec!(100), dec!(1), dec!(0));
        let maker = sample_order(OrderSide::Buy, dec!(101), dec!(1), dec!(0));
        assert!(price_matches(&taker, &maker));
    }

    #[test]
    fn state_transitions_follow_remaining_amount() {
        assert_eq!(
            next_state(&sample_order(OrderSide::Buy, dec!(1), dec!(1), dec!(1))),
            OrderState::Filled
        );
        assert_eq!(
            next_state(&sample_order(OrderSide::Buy, dec!(1), dec!(2), dec!(1))),
            OrderState::PartiallyFilled
        );
        assert_eq!(
            next_state(&sample_order(OrderSide::Buy, dec!(1), dec!(2), dec!(0))),
            OrderState::Waiting
        );
    }
}
