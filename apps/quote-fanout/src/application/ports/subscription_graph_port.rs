//! Subscription Graph Port (Driven Port)
//!
//! Instrument and subscriber nodes joined by a many-to-many "watches" edge.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::instrument::SubscriptionTopology;

/// Node and edge totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    /// Instrument nodes.
    pub instruments: usize,
    /// Subscriber nodes.
    pub subscribers: usize,
    /// Watch edges.
    pub watches: usize,
}

/// Port for the subscription graph.
#[async_trait]
pub trait SubscriptionGraphPort: Send + Sync {
    /// Seed nodes and edges with merge semantics.
    ///
    /// Running this any number of times leaves the same graph as running it
    /// once.
    async fn provision(&self, topology: &SubscriptionTopology) -> Result<(), StoreError>;

    /// Names of subscribers watching an instrument code.
    ///
    /// An empty list is a valid answer and is not an error.
    async fn watchers(&self, instrument_code: &str) -> Result<Vec<String>, StoreError>;

    /// Count nodes and edges currently in the graph.
    async fn counts(&self) -> Result<GraphCounts, StoreError>;
}
