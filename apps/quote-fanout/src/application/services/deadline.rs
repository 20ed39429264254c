//! Per-call timeout for store operations.

use std::future::Future;
use std::time::Duration;

use crate::application::ports::{StoreError, StoreKind};

/// Run a store call, failing with [`StoreError::Timeout`] if it does not
/// finish within `limit`.
pub async fn bounded<T, F>(store: StoreKind, limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout {
            store,
            after: limit,
        }))
}
