//! Persistence adapters.
//!
//! `PostgreSQL` implementations of the time-series, event, and graph ports,
//! plus in-memory counterparts with fault switches.

mod event_store;
mod in_memory;
mod postgres;
mod subscription_graph;
mod time_series;

pub use event_store::PostgresEventStore;
pub use in_memory::{InMemoryEventStore, InMemorySubscriptionGraph, InMemoryTimeSeriesStore};
pub use postgres::{DEFAULT_MAX_CONNECTIONS, connect_pool, pg_error};
pub use subscription_graph::PostgresSubscriptionGraph;
pub use time_series::PostgresTimeSeriesStore;
