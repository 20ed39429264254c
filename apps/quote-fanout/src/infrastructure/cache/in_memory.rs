//! In-memory quote cache with expiry.
//!
//! Uses the tokio clock, so expiry follows paused test time.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::{QuoteCachePort, StoreError, StoreKind};

/// One recorded `set_with_ttl` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWrite {
    /// Key written.
    pub key: String,
    /// Value written.
    pub value: String,
    /// Requested expiry.
    pub ttl: Duration,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<String, (String, Instant)>,
    writes: Vec<CacheWrite>,
    available: bool,
}

/// `QuoteCachePort` backed by a map.
#[derive(Debug)]
pub struct InMemoryQuoteCache {
    inner: Mutex<Inner>,
}

impl Default for InMemoryQuoteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQuoteCache {
    /// Create an empty, reachable cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                writes: Vec::new(),
                available: true,
            }),
        }
    }

    /// Put an entry without recording it as a write.
    pub fn seed(&self, key: &str, value: &str, ttl: Duration) {
        self.inner
            .lock()
            .entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    /// Make every call fail with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    /// Every write so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<CacheWrite> {
        self.inner.lock().writes.clone()
    }

    fn check(inner: &Inner) -> Result<(), StoreError> {
        if inner.available {
            Ok(())
        } else {
            Err(StoreError::unavailable(StoreKind::Cache, "connection refused"))
        }
    }
}

#[async_trait]
impl QuoteCachePort for InMemoryQuoteCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock();
        Self::check(&inner)?;

        match inner.entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                inner.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check(&inner)?;

        inner
            .entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        inner.writes.push(CacheWrite {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Self::check(&self.inner.lock())
    }
}
