//! Time-Series Port (Driven Port)
//!
//! Append-only price history keyed by (instrument code, observation time).

use async_trait::async_trait;

use super::StoreError;
use crate::domain::quote::PriceObservation;

/// Port for the price history store.
#[async_trait]
pub trait TimeSeriesPort: Send + Sync {
    /// Create the schema if it does not exist. Safe to run repeatedly.
    async fn provision(&self) -> Result<(), StoreError>;

    /// Append one observation.
    async fn insert(&self, observation: &PriceObservation) -> Result<(), StoreError>;

    /// Most recent observations for an instrument, newest first.
    async fn recent(
        &self,
        instrument_code: &str,
        limit: usize,
    ) -> Result<Vec<PriceObservation>, StoreError>;
}
