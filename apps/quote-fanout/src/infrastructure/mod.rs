//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Quote cache adapters (Redis, in-memory).
pub mod cache;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Time-series, event, and graph stores (`PostgreSQL`, in-memory).
pub mod persistence;

/// Quote source adapters (Binance REST, scripted mock).
pub mod quote_source;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
