//! Configuration Module
//!
//! Configuration loading for the ingestor service.

mod settings;

pub use settings::{ConfigError, Endpoints, IngestorConfig, parse_instruments, parse_subscribers};
