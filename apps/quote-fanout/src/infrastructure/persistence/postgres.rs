//! Shared `PostgreSQL` plumbing for the store adapters.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::application::ports::{StoreError, StoreKind};

/// Default pool size per store.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Open a connection pool for one store.
///
/// # Errors
///
/// Returns an error if the database cannot be connected.
pub async fn connect_pool(database_url: &str, store: StoreKind) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .map_err(pg_error(store))?;

    info!(
        store = store.as_str(),
        max_connections = DEFAULT_MAX_CONNECTIONS,
        "PostgreSQL connection pool initialized"
    );
    Ok(pool)
}

/// Map a `sqlx` error onto the store it came from.
///
/// Transport and pool failures are `Unavailable`; anything the server
/// answered is `Rejected`.
pub fn pg_error(store: StoreKind) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::unavailable(store, e.to_string()),
        _ => StoreError::rejected(store, e.to_string()),
    }
}
