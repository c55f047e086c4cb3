use sqlx::PgPool;

use crate::models::Currency;

pub struct CurrencyRepo;

impl CurrencyRepo {
    pub async fn create(pool: &PgPool, name: &str, symbol: &str) -> Result<Currency, sqlx::Error> {
        sqlx::query_as::<_, Currency>(
            "INSERT INTO currencies (name, symbol) VALUES ($1, $2) RETURNING id, name, symbol",
        )
        .bind(name)
        .bind(symbol)
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Currency>, sqlx::Error> {
        sqlx::query_as::<_, Currency>("SELECT id, name, symbol FROM currencies ORDER BY id")
            .fetch_all(pool)
            .await
    }
}
