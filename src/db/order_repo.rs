use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use crate::models::{Order, OrderSide, OrderState, OrderType};

pub struct OrderRepo;

impl OrderRepo {
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        target_market_id: i64,
        order_type: OrderType,
        order_side: OrderSide,
        price: Decimal,
        amount: Decimal,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (target_market_id, order_type, order_side, price, amount, filled_amount, remaining_amount, order_state)
            VALUES ($1, $2, $3, $4, $5, 0, $5, 'waiting')
            RETURNING id, target_market_id, order_type, order_side, price, amount, filled_amount,
                      remaining_amount, order_state, created_at, updated_at, filled_at
            "#,
        )
        .bind(target_market_id)
        .bind(order_type)
        .bind(order_side)
        .bind(price)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }

    /// Locked read of a single order row. Callers take this lock before
    /// scanning the opposing side, per the lock-ordering rule: incoming
    /// order row first, then opposing rows in scan order.
    pub async fn get_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, target_market_id, order_type, order_side, price, amount, filled_amount,
                   remaining_amount, order_state, created_at, updated_at, filled_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Opposing resting orders for `market_id`, ordered by price-time
    /// priority: best price first (lowest ask / highest bid), then oldest
    /// `created_at` first. The whole candidate set is locked up front by a
    /// single `FOR UPDATE` query, not row by row as the scan consumes it.
    pub async fn find_matching_for_update(
        tx: &mut Transaction<'_, Postgres>,
        market_id: i64,
        opposite_side: OrderSide,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let query = match opposite_side {
            OrderSide::Sell => {
                r#"
                SELECT id, target_market_id, order_type, order_side, price, amount, filled_amount,
                       remaining_amount, order_state, created_at, updated_at, filled_at
                FROM orders
                WHERE target_market_id = $1
                  AND order_side = 'sell'
                  AND order_state IN ('waiting', 'partially_filled')
                  AND remaining_amount > 0
                ORDER BY price ASC, created_at ASC
                FOR UPDATE
                "#
            }
            OrderSide::Buy => {
                r#"
                SELECT id, target_market_id, order_type, order_side, price, amount, filled_amount,
                       remaining_amount, order_state, created_at, updated_at, filled_at
                FROM orders
                WHERE target_market_id = $1
                  AND order_side = 'buy'
                  AND order_state IN ('waiting', 'partially_filled')
                  AND remaining_amount > 0
                ORDER BY price DESC, created_at ASC
                FOR UPDATE
                "#
            }
        };

        sqlx::query_as::<_, Order>(query)
            .bind(market_id)
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn update_amounts_and_state(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        filled_amount: Decimal,
        remaining_amount: Decimal,
        order_state: OrderState,
        filled_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE orders
            SET filled_amount = $2,
                remaining_amount = $3,
                order_state = $4,
                filled_at = COALESCE(filled_at, $5),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(filled_amount)
        .bind(remaining_amount)
        .bind(order_state)
        .bind(filled_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Active (restable) orders for a market/side, ordered for depth
    /// aggregation and for rebuilding the depth cache from the record
    /// store.
    pub async fn active_for_market_side(
        pool: &sqlx::PgPool,
        market_id: i64,
        side: OrderSide,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let query = match side {
            OrderSide::Sell => {
                r#"
                SELECT id, target_market_id, order_type, order_side, price, amount, filled_amount,
                       remaining_amount, order_state, created_at, updated_at, filled_at
                FROM orders
                WHERE target_market_id = $1
                  AND order_side = 'sell'
                  AND order_state IN ('waiting', 'partially_filled')
                  AND remaining_amount > 0
                ORDER BY price ASC, created_at ASC
                "#
            }
            OrderSide::Buy => {
                r#"
                SELECT id, target_market_id, order_type, order_side, price, amount, filled_amount,
                       remaining_amount, order_state, created_at, updated_at, filled_at
                FROM orders
                WHERE target_market_id = $1
                  AND order_side = 'buy'
                  AND order_state IN ('waiting', 'partially_filled')
                  AND remaining_amount > 0
                ORDER BY price DESC, created_at ASC
                "#
            }
        };

        sqlx::query_as::<_, Order>(query)
            .bind(market_id)
            .fetch_all(pool)
            .await
    }
}
