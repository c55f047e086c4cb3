//! Order-book depth cache: a Redis-backed, eventually-consistent projection
//! of the resting orders held in the record store.
//!
//! Keyspace (bit-exact to the record store's matching engine):
//!   orderbook:<symbol>:buy / :sell   sorted sets, member = JSON {id, price, amount, created_at}
//!   orderbook:last_update:<symbol>   ISO-8601 timestamp
//!   orderbook:last_sync:<symbol>     ISO-8601 timestamp
//!   sync_lock:<symbol>               SET NX EX 30
//!
//! Score is `-price` for the buy side (so ZRANGE ascending yields highest
//! price first) and `price` for the sell side (lowest price first) — the
//! zset itself encodes price-time priority, so ordering never needs to be
//! redone at read time, only aggregation across orders at the same price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::redis_client::RedisClient;
use crate::db::order_repo::OrderRepo;
use crate::models::{Order, OrderSide};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DepthMember {
    id: i64,
    price: Decimal,
    amount: Decimal,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthView {
    pub market_symbol: String,
    pub buy: Vec<DepthLevel>,
    pub sell: Vec<DepthLevel>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthStats {
    pub market_symbol: String,
    pub buy_orders_count: i64,
    pub sell_orders_count: i64,
    pub last_update: Option<String>,
    pub last_sync: Option<String>,
    pub total_orders: i64,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub struct DepthCache {
    redis: Arc<RedisClient>,
    pool: PgPool,
}

fn buy_key(symbol: &str) -> String {
    format!("orderbook:{symbol}:buy")
}
fn sell_key(symbol: &str) -> String {
    format!("orderbook:{symbol}:sell")
}
fn last_update_key(symbol: &str) -> String {
    format!("orderbook:last_update:{symbol}")
}
fn last_sync_key(symbol: &str) -> String {
    format!("orderbook:last_sync:{symbol}")
}
fn sync_lock_key(symbol: &str) -> String {
    format!("sync_lock:{symbol}")
}

fn side_key(symbol: &str, side: OrderSide) -> String {
    match side {
        OrderSide::Buy => buy_key(symbol),
        OrderSide::Sell => sell_key(symbol),
    }
}

fn score_for(side: OrderSide, price: Decimal) -> f64 {
    let price: f64 = price.to_string().parse().unwrap_or(0.0);
    match side {
        OrderSide::Buy => -price,
        OrderSide::Sell => price,
    }
}

impl DepthCache {
    pub fn new(redis: Arc<RedisClient>, pool: PgPool) -> Self {
        Self { redis, pool }
    }

    /// Reflects one order's state into the cache. Mirrors the original
    /// engine's behavior exactly: a newly-resting order (a limit order's
    /// unfilled residue) is added once; an order reaching a terminal state
    /// is removed. Orders already resting that get partially filled by a
    /// later taker are *not* individually patched here — that staleness is
    /// corrected by `sync`, which performs a full rebuild from the record
    /// store. This is a real (if narrow) source of drift in the original
    /// implementation, carried forward deliberately rather than papered
    /// over, since the record store stays authoritative regardless.
    pub async fn update(&self, market_symbol: &str, order: &Order) {
        let result = if order.order_state.is_terminal() {
            self.remove_member(market_symbol, order).await
        } else if order.order_state.is_restable() && order.remaining_amount > Decimal::ZERO {
            self.add_member(market_symbol, order).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            tracing::warn!("depth cache update failed for order {}: {}", order.id, e);
        }

        if let Err(e) = self
            .redis
            .set(&last_update_key(market_symbol), now_iso(), None)
            .await
        {
            tracing::warn!("failed to set last_update for {}: {}", market_symbol, e);
        }
    }

    async fn add_member(&self, market_symbol: &str, order: &Order) -> Result<(), redis::RedisError> {
        let key = side_key(market_symbol, order.order_side);
        let member = DepthMember {
            id: order.id,
            price: order.price,
            amount: order.remaining_amount,
            created_at: order.created_at,
        };
        let json = serde_json::to_string(&member).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "serialization error", e.to_string()))
        })?;
        let score = score_for(order.order_side, order.price);
        self.redis.zadd(&key, score, json).await?;
        Ok(())
    }

    async fn remove_member(&self, market_symbol: &str, order: &Order) -> Result<(), redis::RedisError> {
        let key = side_key(market_symbol, order.order_side);
        let members: Vec<String> = self.redis.zrange(&key, 0, -1).await?;
        for member_json in members {
            if let Ok(member) = serde_json::from_str::<DepthMember>(&member_json) {
                if member.id == order.id {
                    self.redis.zrem(&key, member_json).await?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Cold-cache-then-sync-then-reread, falling back to direct database
    /// aggregation on any cache error.
    pub async fn get_depth(&self, market_symbol: &str, limit: usize) -> DepthView {
        match self.try_get_depth(market_symbol, limit).await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(
                    "depth cache read failed for {}, falling back to database: {}",
                    market_symbol,
                    e
                );
                self.get_depth_from_db(market_symbol, limit).await
            }
        }
    }

    async fn try_get_depth(&self, market_symbol: &str, limit: usize) -> Result<DepthView, CacheError> {
        let mut buy = self.read_side(market_symbol, OrderSide::Buy, limit).await?;
        let mut sell = self.read_side(market_symbol, OrderSide::Sell, limit).await?;

        if buy.is_empty() && sell.is_empty() {
            self.sync(market_symbol).await?;
            buy = self.read_side(market_symbol, OrderSide::Buy, limit).await?;
            sell = self.read_side(market_symbol, OrderSide::Sell, limit).await?;
        }

        Ok(DepthView {
            market_symbol: market_symbol.to_string(),
            buy,
            sell,
            timestamp: chrono::Utc::now(),
        })
    }

    async fn read_side(
        &self,
        market_symbol: &str,
        side: OrderSide,
        limit: usize,
    ) -> Result<Vec<DepthLevel>, CacheError> {
        let key = side_key(market_symbol, side);
        let members: Vec<String> = self
            .redis
            .zrange(&key, 0, limit.saturating_sub(1) as isize)
            .await?;

        let prices = members
            .iter()
            .filter_map(|json| serde_json::from_str::<DepthMember>(json).ok())
            .map(|m| (m.price, m.amount));

        Ok(aggregate_levels(prices, limit))
    }

    /// Full rebuild from the record store, guarded by `sync_lock:<symbol>`
    /// (`SET NX EX 30`) so concurrent callers don't race each other.
    pub async fn sync(&self, market_symbol: &str) -> Result<(), CacheError> {
        let lock_key = sync_lock_key(market_symbol);
        let acquired: bool = self
            .redis
            .with_retry(|mut conn| {
                let lock_key = lock_key.clone();
                async move {
                    redis::cmd("SET")
                        .arg(&lock_key)
                        .arg("1")
                        .arg("NX")
                        .arg("EX")
                        .arg(30)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                        .map(|v| v.is_some())
                }
            })
            .await?;

        if !acquired {
            tracing::debug!("sync already in progress for {}", market_symbol);
            return Ok(());
        }

        let result = self.rebuild(market_symbol).await;
        let _ = self.redis.del(&lock_key).await;
        result
    }

    async fn rebuild(&self, market_symbol: &str) -> Result<(), CacheError> {
        self.redis.del(&buy_key(market_symbol)).await?;
        self.redis.del(&sell_key(market_symbol)).await?;

        let market = crate::db::market_repo::MarketRepo::get_by_symbol(&self.pool, market_symbol).await?;
        let Some(market) = market else {
            tracing::warn!("market {} not found during depth cache sync", market_symbol);
            return Ok(());
        };

        for side in [OrderSide::Buy, OrderSide::Sell] {
            let orders = OrderRepo::active_for_market_side(&self.pool, market.id, side).await?;
            for order in orders {
                self.add_member(market_symbol, &order).await?;
            }
        }

        self.redis
            .set(&last_sync_key(market_symbol), now_iso(), None)
            .await?;
        Ok(())
    }

    async fn get_depth_from_db(&self, market_symbol: &str, limit: usize) -> DepthView {
        let Ok(Some(market)) = crate::db::market_repo::MarketRepo::get_by_symbol(&self.pool, market_symbol).await
        else {
            return DepthView {
                market_symbol: market_symbol.to_string(),
                buy: Vec::new(),
                sell: Vec::new(),
                timestamp: chrono::Utc::now(),
            };
        };

        let buy = aggregate_from_db(&self.pool, market.id, OrderSide::Buy, limit).await;
        let sell = aggregate_from_db(&self.pool, market.id, OrderSide::Sell, limit).await;

        DepthView {
            market_symbol: market_symbol.to_string(),
            buy,
            sell,
            timestamp: chrono::Utc::now(),
        }
    }

    pub async fn stats(&self, market_symbol: &str) -> DepthStats {
        let buy_key = buy_key(market_symbol);
        let sell_key = sell_key(market_symbol);

        let buy_members: Vec<String> = self.redis.zrange(&buy_key, 0, -1).await.unwrap_or_default();
        let sell_members: Vec<String> = self.redis.zrange(&sell_key, 0, -1).await.unwrap_or_default();
        let last_update = self
            .redis
            .get::<String>(&last_update_key(market_symbol))
            .await
            .ok()
            .flatten();
        let last_sync = self
            .redis
            .get::<String>(&last_sync_key(market_symbol))
            .await
            .ok()
            .flatten();

        DepthStats {
            market_symbol: market_symbol.to_string(),
            buy_orders_count: buy_members.len() as i64,
            sell_orders_count: sell_members.len() as i64,
            total_orders: (buy_members.len() + sell_members.len()) as i64,
            last_update,
            last_sync,
        }
    }
}

async fn aggregate_from_db(pool: &PgPool, market_id: i64, side: OrderSide, limit: usize) -> Vec<DepthLevel> {
    let orders = match OrderRepo::active_for_market_side(pool, market_id, side).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!("database fallback failed for market {}: {}", market_id, e);
            return Vec::new();
        }
    };

    aggregate_levels(orders.into_iter().map(|o| (o.price, o.remaining_amount)), limit)
}

/// Sums amounts at each distinct price, preserving the order prices are
/// first seen in (the scan's price-time priority order), then truncates to
/// `limit` levels.
fn aggregate_levels(entries: impl Iterator<Item = (Decimal, Decimal)>, limit: usize) -> Vec<DepthLevel> {
    let mut ordered_prices = Vec::new();
    let mut totals: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for (price, amount) in entries {
        if !totals.contains_key(&price) {
            ordered_prices.push(price);
        }
        *totals.entry(price).or_insert(Decimal::ZERO) += amount;
    }

    ordered_prices
        .into_iter()
        .take(limit)
        .map(|price| DepthLevel {
            price,
            amount: totals[&price],
        })
        .collect()
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_score_is_negative_price() {
        assert_eq!(score_for(OrderSide::Buy, dec!(100)), -100.0);
        assert_eq!(score_for(OrderSide::Sell, dec!(100)), 100.0);
    }

    #[test]
    fn aggregates_same_price_without_merging_order() {
        let entries = vec![
            (dec!(50000), dec!(0.2)),
            (dec!(51000), dec!(2.0)),
            (dec!(50000), dec!(0.3)),
        ];
        let levels = aggregate_levels(entries.into_iter(), 10);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, dec!(50000));
        assert_eq!(levels[0].amount, dec!(0.5));
        assert_eq!(levels[1].price, dec!(51000));
        assert_eq!(levels[1].amount, dec!(2.0));
    }

    #[test]
    fn truncates_to_limit() {
        let entries = vec![(dec!(1), dec!(1)), (dec!(2), dec!(1)), (dec!(3), dec!(1))];
        let levels = aggregate_levels(entries.into_iter(), 2);
        assert_eq!(levels.len(), 2);
    }
}
