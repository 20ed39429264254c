//! Subscription graph as node and edge tables in `PostgreSQL`.
//!
//! ```text
//! graph_subscribers(name) ──< graph_watches(subscriber_name, instrument_code) >── graph_instruments(code)
//! ```
//!
//! Seeding uses `ON CONFLICT DO NOTHING` on every table, which gives the
//! same merge semantics as a graph `MERGE`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::postgres::{connect_pool, pg_error};
use crate::application::ports::{GraphCounts, StoreError, StoreKind, SubscriptionGraphPort};
use crate::domain::instrument::SubscriptionTopology;

const STORE: StoreKind = StoreKind::SubscriptionGraph;

const SCHEMA: [&str; 3] = [
    r"
    CREATE TABLE IF NOT EXISTS graph_instruments (
        code TEXT PRIMARY KEY
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS graph_subscribers (
        name TEXT PRIMARY KEY
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS graph_watches (
        subscriber_name TEXT NOT NULL REFERENCES graph_subscribers (name),
        instrument_code TEXT NOT NULL REFERENCES graph_instruments (code),
        PRIMARY KEY (subscriber_name, instrument_code)
    )
    ",
];

/// `SubscriptionGraphPort` over relational node/edge tables.
#[derive(Debug, Clone)]
pub struct PostgresSubscriptionGraph {
    pool: PgPool,
}

impl PostgresSubscriptionGraph {
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
impl SubscriptionGraphPort for PostgresSubscriptionGraph {
    async fn provision(&self, topology: &SubscriptionTopology) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(pg_error(STORE))?;
        }

        let (subscribers, codes): (Vec<String>, Vec<String>) = topology
            .watches
            .iter()
            .map(|w| (w.subscriber.clone(), w.instrument_code.clone()))
            .unzip();

        let mut tx = self.pool.begin().await.map_err(pg_error(STORE))?;

        sqlx::query(
            "INSERT INTO graph_instruments (code) SELECT UNNEST($1::TEXT[]) ON CONFLICT DO NOTHING",
        )
        .bind(&topology.instrument_codes)
        .execute(&mut *tx)
        .await
        .map_err(pg_error(STORE))?;

        sqlx::query(
            "INSERT INTO graph_subscribers (name) SELECT UNNEST($1::TEXT[]) ON CONFLICT DO NOTHING",
        )
        .bind(&topology.subscriber_names)
        .execute(&mut *tx)
        .await
        .map_err(pg_error(STORE))?;

        sqlx::query(
            r"
            INSERT INTO graph_watches (subscriber_name, instrument_code)
            SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(&subscribers)
        .bind(&codes)
        .execute(&mut *tx)
        .await
        .map_err(pg_error(STORE))?;

        tx.commit().await.map_err(pg_error(STORE))
    }

    async fn watchers(&self, instrument_code: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            r"
            SELECT subscriber_name
            FROM graph_watches
            WHERE instrument_code = $1
            ORDER BY subscriber_name
            ",
        )
        .bind(instrument_code)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_error(STORE))
    }

    async fn counts(&self) -> Result<GraphCounts, StoreError> {
        let (instruments, subscribers, watches): (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                (SELECT COUNT(*) FROM graph_instruments),
                (SELECT COUNT(*) FROM graph_subscribers),
                (SELECT COUNT(*) FROM graph_watches)
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(pg_error(STORE))?;

        Ok(GraphCounts {
            instruments: usize::try_from(instruments).unwrap_or(0),
            subscribers: usize::try_from(subscribers).unwrap_or(0),
            watches: usize::try_from(watches).unwrap_or(0),
        })
    }
}
