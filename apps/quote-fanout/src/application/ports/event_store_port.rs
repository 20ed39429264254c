//! Event Store Port (Driven Port)
//!
//! Append-only store of raw quote payloads for audit and replay.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::quote::RawEvent;

/// Port for the raw event store.
#[async_trait]
pub trait EventStorePort: Send + Sync {
    /// Create the schema if it does not exist. Safe to run repeatedly.
    async fn provision(&self) -> Result<(), StoreError>;

    /// Append one raw event. No uniqueness is enforced.
    async fn insert(&self, event: &RawEvent) -> Result<(), StoreError>;
}
