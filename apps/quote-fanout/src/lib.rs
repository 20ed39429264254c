#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Quote Fan-out - Periodic Price Ingestor
//!
//! Samples the current price of a fixed set of instruments on an interval,
//! serves repeated reads from a short-lived cache, and fans every resolved
//! quote out to three independent stores.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types and rules
//!   - `instrument`: Instruments, subscribers, subscription topology
//!   - `quote`: Quotes, price parsing, observations, raw events
//!   - `trend`: Up / Down / Flat / Unknown classification
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Quote source, cache, time-series, event store, graph
//!   - `services`: Price resolver, ingestion cycle, scheduler, bootstrap
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `quote_source`: Binance REST ticker, scripted mock
//!   - `cache`: Redis, in-memory
//!   - `persistence`: `PostgreSQL` stores, in-memory stores
//!   - `config`, `telemetry`, `metrics`
//!
//! # Data Flow
//!
//! ```text
//!                ┌──────────┐ miss ┌──────────────┐
//! instrument ───►│  Cache   │─────►│ Quote Source │
//!                └────┬─────┘      └──────┬───────┘
//!                     │ hit               │ fetch (+ cache write)
//!                     ▼                   ▼
//!                ┌─────────────────────────────┐
//!                │   trend vs last price       │
//!                └──────────────┬──────────────┘
//!                               ├──► Event store   (raw payload)
//!                               ├──► Time series   (code, time, price)
//!                               └──► Graph         (who watches this?)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{Instrument, Subscriber, SubscriptionTopology, Watch};
pub use domain::quote::{PriceObservation, PriceOrigin, Quote, RawEvent};
pub use domain::trend::{Direction, trend};

// Ports
pub use application::ports::{
    EventStorePort, GraphCounts, QuoteCachePort, QuoteSourceError, QuoteSourcePort, StoreError,
    StoreKind, SubscriptionGraphPort, TimeSeriesPort,
};

// Services
pub use application::services::{
    Backends, CycleReport, FanOutReport, IngestSettings, IngestionCycle, InstrumentOutcome,
    InstrumentReport, LastPriceMemory, PriceResolver, ResolveError, Scheduler, StartupError,
    bootstrap, startup_step,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, IngestorConfig};

// Metrics
pub use infrastructure::metrics::{init_metrics, record_cycle};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
