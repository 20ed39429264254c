//! Application Layer - Ports and the ingestion services.
//!
//! Ports are the capabilities the core needs from the outside world.
//! Services orchestrate those capabilities into the ingestion cycle.

/// Port interfaces for the quote source and the backing stores.
pub mod ports;

/// Cache-aside resolver, ingestion cycle, scheduler, and startup.
pub mod services;
