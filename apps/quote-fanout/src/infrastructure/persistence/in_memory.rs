//! In-memory store adapters.
//!
//! Same contracts as the `PostgreSQL` adapters, plus switches to simulate an
//! outage or a slow store. Used by the end-to-end tests and local dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{
    EventStorePort, GraphCounts, StoreError, StoreKind, SubscriptionGraphPort, TimeSeriesPort,
};
use crate::domain::instrument::SubscriptionTopology;
use crate::domain::quote::{Payload, PriceObservation, RawEvent};

/// Outage and latency switches shared by the in-memory stores.
#[derive(Debug)]
struct Faults {
    store: StoreKind,
    available: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
}

impl Faults {
    fn new(store: StoreKind) -> Self {
        Self {
            store,
            available: Mutex::new(true),
            latency: Mutex::new(None),
        }
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.available.lock() {
            Ok(())
        } else {
            Err(StoreError::unavailable(self.store, "connection refused"))
        }
    }
}

// =============================================================================
// Time series
// =============================================================================

/// `TimeSeriesPort` keyed by (instrument code, observation time).
#[derive(Debug)]
pub struct InMemoryTimeSeriesStore {
    rows: Mutex<BTreeMap<(String, DateTime<Utc>), Decimal>>,
    faults: Faults,
}

impl Default for InMemoryTimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTimeSeriesStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            faults: Faults::new(StoreKind::TimeSeries),
        }
    }

    /// Fail every call with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        *self.faults.available.lock() = available;
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.faults.latency.lock() = latency;
    }

    /// Every stored observation, ordered by code then time.
    #[must_use]
    pub fn observations(&self) -> Vec<PriceObservation> {
        self.rows
            .lock()
            .iter()
            .map(|((code, at), price)| PriceObservation::new(code.clone(), *at, *price))
            .collect()
    }

    /// Number of stored observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl TimeSeriesPort for InMemoryTimeSeriesStore {
    async fn provision(&self) -> Result<(), StoreError> {
        self.faults.enter().await
    }

    async fn insert(&self, observation: &PriceObservation) -> Result<(), StoreError> {
        self.faults.enter().await?;
        self.rows.lock().insert(
            (observation.instrument_code.clone(), observation.observed_at),
            observation.price,
        );
        Ok(())
    }

    async fn recent(
        &self,
        instrument_code: &str,
        limit: usize,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        self.faults.enter().await?;
        Ok(self
            .rows
            .lock()
            .iter()
            .rev()
            .filter(|((code, _), _)| code == instrument_code)
            .take(limit)
            .map(|((code, at), price)| PriceObservation::new(code.clone(), *at, *price))
            .collect())
    }
}

// =============================================================================
// Event store
// =============================================================================

/// `EventStorePort` holding documents in insertion order.
#[derive(Debug)]
pub struct InMemoryEventStore {
    documents: Mutex<Vec<Payload>>,
    faults: Faults,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            faults: Faults::new(StoreKind::EventStore),
        }
    }

    /// Fail every call with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        *self.faults.available.lock() = available;
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.faults.latency.lock() = latency;
    }

    /// Stored documents, oldest first.
    #[must_use]
    pub fn documents(&self) -> Vec<Payload> {
        self.documents.lock().clone()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl EventStorePort for InMemoryEventStore {
    async fn provision(&self) -> Result<(), StoreError> {
        self.faults.enter().await
    }

    async fn insert(&self, event: &RawEvent) -> Result<(), StoreError> {
        self.faults.enter().await?;
        self.documents.lock().push(event.to_document());
        Ok(())
    }
}

// =============================================================================
// Subscription graph
// =============================================================================

#[derive(Debug, Default)]
struct Graph {
    instruments: BTreeSet<String>,
    subscribers: BTreeSet<String>,
    // (instrument code, subscriber name)
    watches: BTreeSet<(String, String)>,
}

/// `SubscriptionGraphPort` over ordered sets.
#[derive(Debug)]
pub struct InMemorySubscriptionGraph {
    graph: Mutex<Graph>,
    lookups: Mutex<usize>,
    faults: Faults,
}

impl Default for InMemorySubscriptionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySubscriptionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(Graph::default()),
            lookups: Mutex::new(0),
            faults: Faults::new(StoreKind::SubscriptionGraph),
        }
    }

    /// Fail every call with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        *self.faults.available.lock() = available;
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.faults.latency.lock() = latency;
    }

    /// Number of `watchers` calls so far, failed ones included.
    #[must_use]
    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }
}

#[async_trait]
impl SubscriptionGraphPort for InMemorySubscriptionGraph {
    async fn provision(&self, topology: &SubscriptionTopology) -> Result<(), StoreError> {
        self.faults.enter().await?;

        let mut graph = self.graph.lock();
        graph
            .instruments
            .extend(topology.instrument_codes.iter().cloned());
        graph
            .subscribers
            .extend(topology.subscriber_names.iter().cloned());
        for watch in &topology.watches {
            graph.subscribers.insert(watch.subscriber.clone());
            graph.instruments.insert(watch.instrument_code.clone());
            graph
                .watches
                .insert((watch.instrument_code.clone(), watch.subscriber.clone()));
        }
        Ok(())
    }

    async fn watchers(&self, instrument_code: &str) -> Result<Vec<String>, StoreError> {
        *self.lookups.lock() += 1;
        self.faults.enter().await?;

        Ok(self
            .graph
            .lock()
            .watches
            .iter()
            .filter(|(code, _)| code == instrument_code)
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn counts(&self) -> Result<GraphCounts, StoreError> {
        self.faults.enter().await?;

        let graph = self.graph.lock();
        Ok(GraphCounts {
            instruments: graph.instruments.len(),
            subscribers: graph.subscribers.len(),
            watches: graph.watches.len(),
        })
    }
}
