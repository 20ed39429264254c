//! Capability objects for every external system.

use std::fmt;
use std::sync::Arc;

use crate::application::ports::{
    EventStorePort, QuoteCachePort, QuoteSourcePort, SubscriptionGraphPort, TimeSeriesPort,
};

/// The quote source and the four stores.
///
/// Built once at startup and shared by reference with every cycle.
#[derive(Clone)]
pub struct Backends {
    /// External quote provider.
    pub source: Arc<dyn QuoteSourcePort>,
    /// Short-lived quote cache.
    pub cache: Arc<dyn QuoteCachePort>,
    /// Price history.
    pub time_series: Arc<dyn TimeSeriesPort>,
    /// Raw payload documents.
    pub events: Arc<dyn EventStorePort>,
    /// Subscriber/instrument relationships.
    pub graph: Arc<dyn SubscriptionGraphPort>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
