//! Redis quote cache.
//!
//! Values are stored with `SET key value EX ttl`, so expiry is handled by
//! Redis itself and a missing key is the only "miss" signal.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::application::ports::{QuoteCachePort, StoreError, StoreKind};

/// Redis-backed `QuoteCachePort`.
///
/// Holds a single auto-reconnecting connection shared by all calls.
#[derive(Clone)]
pub struct RedisQuoteCache {
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisQuoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQuoteCache").finish_non_exhaustive()
    }
}

impl RedisQuoteCache {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(redis_error)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(redis_error)?;

        debug!("Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl QuoteCachePort for RedisQuoteCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(redis_error)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.set_ex(key, value, ttl_seconds(ttl))
            .await
            .map_err(redis_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(())
    }
}

/// Whole seconds for `EX`, rounded up and never zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

fn redis_error(e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::unavailable(StoreKind::Cache, e.to_string())
    } else {
        StoreError::rejected(StoreKind::Cache, e.to_string())
    }
}
