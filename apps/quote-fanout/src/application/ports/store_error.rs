//! Uniform store failure type.
//!
//! Every backing-store call returns `Result<_, StoreError>` so the cycle can
//! aggregate failures per store without caring which backend produced them.

use std::fmt;
use std::time::Duration;

/// Which backing store a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Short-lived quote cache.
    Cache,
    /// Price history.
    TimeSeries,
    /// Raw payload documents.
    EventStore,
    /// Subscriber/instrument relationships.
    SubscriptionGraph,
}

impl StoreKind {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::TimeSeries => "time_series",
            Self::EventStore => "event_store",
            Self::SubscriptionGraph => "subscription_graph",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to a backing store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connection refused, dropped, or otherwise unreachable.
    #[error("{store} unavailable: {message}")]
    Unavailable {
        /// Store that failed.
        store: StoreKind,
        /// Error details.
        message: String,
    },

    /// The store answered but refused the operation.
    #[error("{store} rejected the operation: {message}")]
    Rejected {
        /// Store that failed.
        store: StoreKind,
        /// Error details.
        message: String,
    },

    /// No answer within the per-call timeout.
    #[error("{store} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Store that failed.
        store: StoreKind,
        /// Timeout that elapsed.
        after: Duration,
    },
}

impl StoreError {
    /// Unavailable error for a store.
    pub fn unavailable(store: StoreKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            store,
            message: message.into(),
        }
    }

    /// Rejected error for a store.
    pub fn rejected(store: StoreKind, message: impl Into<String>) -> Self {
        Self::Rejected {
            store,
            message: message.into(),
        }
    }

    /// Store the error belongs to.
    #[must_use]
    pub const fn store(&self) -> StoreKind {
        match self {
            Self::Unavailable { store, .. }
            | Self::Rejected { store, .. }
            | Self::Timeout { store, .. } => *store,
        }
    }

    /// Short error kind label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Rejected { .. } => "rejected",
            Self::Timeout { .. } => "timeout",
        }
    }
}
