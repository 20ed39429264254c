//! Quote Cache Port (Driven Port)
//!
//! Key/value cache with per-key expiry. Values are the serialized price text.

use std::time::Duration;

use async_trait::async_trait;

use super::StoreError;

/// Port for the short-lived quote cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteCachePort: Send + Sync {
    /// Read a key. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Check that the cache is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
