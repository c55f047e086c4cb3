use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::Market;

#[derive(Debug, Error)]
pub enum CreateMarketError {
    #[error("base and quote currency must differ")]
    SameCurrency,
    #[error("currency {0} does not exist")]
    CurrencyNotFound(i64),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct MarketRepo;

impl MarketRepo {
    /// Creates a market, deriving `symbol` from the two currencies'
    /// tickers. Rejects `base_currency_id == quote_currency_id` before ever
    /// touching the database, mirroring `Market.save()`'s `ValidationError`.
    pub async fn create(
        pool: &PgPool,
        base_currency_id: i64,
        quote_currency_id: i64,
        fee: Decimal,
    ) -> Result<Market, CreateMarketError> {
        if base_currency_id == quote_currency_id {
            return Err(CreateMarketError::SameCurrency);
        }

        let base_symbol: Option<String> =
            sqlx::query_scalar("SELECT symbol FROM currencies WHERE id = $1")
                .bind(base_currency_id)
                .fetch_optional(pool)
                .await?;
        let base_symbol = base_symbol.ok_or(CreateMarketError::CurrencyNotFound(base_currency_id))?;

        let quote_symbol: Option<String> =
            sqlx::query_scalar("SELECT symbol FROM currencies WHERE id = $1")
                .bind(quote_currency_id)
                .fetch_optional(pool)
                .await?;
        let quote_symbol =
            quote_symbol.ok_or(CreateMarketError::CurrencyNotFound(quote_currency_id))?;

        let symbol = format!("{base_symbol}_{quote_symbol}");

        let market = sqlx::query_as::<_, Market>(
            r#"
            INSERT INTO markets (base_currency_id, quote_currency_id, symbol, fee)
            VALUES ($1, $2, $3, $4)
            RETURNING id, base_currency_id, quote_currency_id, symbol, fee, state, created_at, updated_at
            "#,
        )
        .bind(base_currency_id)
        .bind(quote_currency_id)
        .bind(&symbol)
        .bind(fee)
        .fetch_one(pool)
        .await?;

        Ok(market)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Market>, sqlx::Error> {
        sqlx::query_as::<_, Market>(
            "SELECT id, base_currency_id, quote_currency_id, symbol, fee, state, created_at, updated_at FROM markets ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn get_by_symbol(pool: &PgPool, symbol: &str) -> Result<Option<Market>, sqlx::Error> {
        sqlx::query_as::<_, Market>(
            "SELECT id, base_currency_id, quote_currency_id, symbol, fee, state, created_at, updated_at FROM markets WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(pool)
        .await
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Market>, sqlx::Error> {
        sqlx::query_as::<_, Market>(
            "SELECT id, base_currency_id, quote_currency_id, symbol, fee, state, created_at, updated_at FROM markets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
