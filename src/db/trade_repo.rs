use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use crate::models::Trade;

pub struct TradeRepo;

impl TradeRepo {
    /// Trades are append-only: this crate never issues an UPDATE or DELETE
    /// against this table.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        maker_order_id: i64,
        taker_order_id: i64,
        price: Decimal,
        amount: Decimal,
        trade_market_id: i64,
        fee: Decimal,
    ) -> Result<Trade, sqlx::Error> {
        sqlx::query_as::<_, Trade>(
            r#"
            INSERT INTO trades (maker_order_id, taker_order_id, price, amount, trade_market_id, fee)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, maker_order_id, taker_order_id, price, amount, trade_market_id, fee, created_at
            "#,
        )
        .bind(maker_order_id)
        .bind(taker_order_id)
        .bind(price)
        .bind(amount)
        .bind(trade_market_id)
        .bind(fee)
        .fetch_one(&mut **tx)
        .await
    }
}
