//! Raw quote documents in a `PostgreSQL` JSONB table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use super::postgres::{connect_pool, pg_error};
use crate::application::ports::{EventStorePort, StoreError, StoreKind};
use crate::domain::quote::RawEvent;

const STORE: StoreKind = StoreKind::EventStore;

/// `EventStorePort` over the `raw_quote_events` table.
///
/// Each event is one row; the document column holds the source payload plus
/// `collected_at`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
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
}

#[async_trait]
impl EventStorePort for PostgresEventStore {
    async fn provision(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS raw_quote_events (
                id BIGSERIAL PRIMARY KEY,
                document JSONB NOT NULL,
                collected_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(pg_error(STORE))?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_raw_quote_events_collected_at
            ON raw_quote_events (collected_at)
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(pg_error(STORE))?;
        Ok(())
    }

    async fn insert(&self, event: &RawEvent) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO raw_quote_events (document, collected_at) VALUES ($1, $2)")
            .bind(Json(Value::Object(event.to_document())))
            .bind(event.collected_at)
            .execute(&self.pool)
            .await
            .map_err(pg_error(STORE))?;
        Ok(())
    }
}
