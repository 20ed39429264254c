//! Port Interfaces
//!
//! Driven ports for every external system the ingestor talks to. Adapters in
//! `infrastructure` implement these; the services only ever see the traits.
//!
//! - `QuoteSourcePort`: current price for a market symbol
//! - `QuoteCachePort`: key/value cache with per-key expiry
//! - `TimeSeriesPort`: append-only price history
//! - `EventStorePort`: append-only raw payload documents
//! - `SubscriptionGraphPort`: who watches which instrument

mod cache_port;
mod event_store_port;
mod quote_source_port;
mod store_error;
mod subscription_graph_port;
mod time_series_port;

pub use cache_port::QuoteCachePort;
pub use event_store_port::EventStorePort;
pub use quote_source_port::{QuoteSourceError, QuoteSourcePort};
pub use store_error::{StoreError, StoreKind};
pub use subscription_graph_port::{GraphCounts, SubscriptionGraphPort};
pub use time_series_port::TimeSeriesPort;

#[cfg(test)]
pub use cache_port::MockQuoteCachePort;
#[cfg(test)]
pub use quote_source_port::MockQuoteSourcePort;
