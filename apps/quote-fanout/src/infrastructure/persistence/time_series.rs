//! Price history in `PostgreSQL` (TimescaleDB when available).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};

use super::postgres::{connect_pool, pg_error};
use crate::application::ports::{StoreError, StoreKind, TimeSeriesPort};
use crate::domain::quote::PriceObservation;

const STORE: StoreKind = StoreKind::TimeSeries;

/// `TimeSeriesPort` over the `price_history` table.
#[derive(Debug, Clone)]
pub struct PostgresTimeSeriesStore {
    pool: PgPool,
}

impl PostgresTimeSeriesStore {
    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be connected.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Ok(Self::with_pool(connect_pool(database_url, STORE).await?))
    }

    /// Use an existing pool.
    #[must_use]
    pub const fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn timescale_available(&self) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'timescaledb')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(pg_error(STORE))
    }
}

#[async_trait]
impl TimeSeriesPort for PostgresTimeSeriesStore {
    async fn provision(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS price_history (
                instrument_code TEXT NOT NULL,
                observed_at TIMESTAMPTZ NOT NULL,
                price NUMERIC NOT NULL,
                PRIMARY KEY (instrument_code, observed_at)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(pg_error(STORE))?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_price_history_code_time
            ON price_history (instrument_code, observed_at DESC)
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(pg_error(STORE))?;

        if !self.timescale_available().await? {
            debug!("timescaledb extension not installed, using a plain table");
            return Ok(());
        }

        let result = sqlx::query(
            r"
            SELECT create_hypertable(
                'price_history',
                'observed_at',
                if_not_exists => TRUE,
                migrate_data => TRUE
            )
            ",
        )
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => info!("price_history is a hypertable"),
            Err(e) => warn!(error = %e, "Failed to create hypertable, continuing with a plain table"),
        }
        Ok(())
    }

    async fn insert(&self, observation: &PriceObservation) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO price_history (instrument_code, observed_at, price)
            VALUES ($1, $2, $3)
            ON CONFLICT (instrument_code, observed_at) DO UPDATE SET price = EXCLUDED.price
            ",
        )
        .bind(&observation.instrument_code)
        .bind(observation.observed_at)
        .bind(observation.price)
        .execute(&self.pool)
        .await
        .map_err(pg_error(STORE))?;
        Ok(())
    }

    async fn recent(
        &self,
        instrument_code: &str,
        limit: usize,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT instrument_code, observed_at, price
            FROM price_history
            WHERE instrument_code = $1
            ORDER BY observed_at DESC
            LIMIT $2
            ",
        )
        .bind(instrument_code)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(pg_error(STORE))?;

        rows.iter()
            .map(|row| {
                let code: String = row.try_get("instrument_code")?;
                let observed_at: DateTime<Utc> = row.try_get("observed_at")?;
                let price: Decimal = row.try_get("price")?;
                Ok(PriceObservation::new(code, observed_at, price))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(pg_error(STORE))
    }
}
