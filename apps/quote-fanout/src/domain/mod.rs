//! Domain Layer - Instruments, quotes, and trend classification.
//!
//! Pure types with no I/O. Everything here is safe to construct in tests
//! without a runtime.

/// Instruments, subscribers, and the watch topology.
pub mod instrument;

/// Quotes, price observations, and raw events.
pub mod quote;

/// Price direction between consecutive observations.
pub mod trend;
