//! Ingestor Configuration Settings
//!
//! Configuration types for the ingestor, loaded from environment variables.
//! Unset variables fall back to defaults; set-but-malformed values are errors.

use std::time::Duration;

use crate::application::services::IngestSettings;
use crate::domain::instrument::{Instrument, Subscriber};

const DEFAULT_INSTRUMENTS: &str = "BTCUSDT:BTC,ETHUSDT:ETH";
const DEFAULT_SUBSCRIBERS: &str = "Paulo,Ana,João";
const DEFAULT_QUOTE_SOURCE_URL: &str = "https://api.binance.com";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Connection strings for the external systems.
#[derive(Clone)]
pub struct Endpoints {
    /// Quote source REST base URL.
    pub quote_source_base_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// Postgres URL for price history.
    pub time_series_database_url: String,
    /// Postgres URL for raw events.
    pub events_database_url: String,
    /// Postgres URL for the subscription graph.
    pub graph_database_url: String,
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints")
            .field("quote_source_base_url", &self.quote_source_base_url)
            .field("redis_url", &"[REDACTED]")
            .field("time_series_database_url", &"[REDACTED]")
            .field("events_database_url", &"[REDACTED]")
            .field("graph_database_url", &"[REDACTED]")
            .finish()
    }
}

/// Complete ingestor configuration.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Instruments sampled every cycle, in order.
    pub instruments: Vec<Instrument>,
    /// Subscribers seeded into the graph.
    pub subscribers: Vec<Subscriber>,
    /// Resolution and fan-out tunables.
    pub ingest: IngestSettings,
    /// Pause between cycles.
    pub interval: Duration,
    /// Per-step bound for startup checks.
    pub startup_timeout: Duration,
    /// Prometheus port (0 = no HTTP listener).
    pub metrics_port: u16,
    /// External systems.
    pub endpoints: Endpoints,
}

impl IngestorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or any set variable is
    /// empty or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`IngestorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = IngestSettings::default();

        let instruments =
            parse_instruments(&env.string("QUOTE_FANOUT_INSTRUMENTS", DEFAULT_INSTRUMENTS)?)?;
        let subscribers =
            parse_subscribers(&env.string("QUOTE_FANOUT_SUBSCRIBERS", DEFAULT_SUBSCRIBERS)?)?;

        let ingest = IngestSettings {
            cache_prefix: env.string("QUOTE_FANOUT_CACHE_PREFIX", &defaults.cache_prefix)?,
            cache_ttl: Duration::from_secs(
                env.parsed("QUOTE_FANOUT_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?,
            ),
            call_timeout: Duration::from_millis(env.parsed(
                "QUOTE_FANOUT_CALL_TIMEOUT_MS",
                u64::try_from(defaults.call_timeout.as_millis()).unwrap_or(5_000),
            )?),
            parallel: env.flag("QUOTE_FANOUT_PARALLEL", defaults.parallel)?,
        };

        if ingest.cache_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                key: "QUOTE_FANOUT_CACHE_TTL_SECS".to_string(),
                value: "0".to_string(),
            });
        }

        let database_url = env.required("DATABASE_URL")?;
        let endpoints = Endpoints {
            quote_source_base_url: env.string("QUOTE_SOURCE_BASE_URL", DEFAULT_QUOTE_SOURCE_URL)?,
            redis_url: env.string("REDIS_URL", DEFAULT_REDIS_URL)?,
            time_series_database_url: env.string("TIMESERIES_DATABASE_URL", &database_url)?,
            events_database_url: env.string("EVENTS_DATABASE_URL", &database_url)?,
            graph_database_url: env.string("GRAPH_DATABASE_URL", &database_url)?,
        };

        Ok(Self {
            instruments,
            subscribers,
            ingest,
            interval: Duration::from_secs(env.parsed("QUOTE_FANOUT_INTERVAL_SECS", 10)?),
            startup_timeout: Duration::from_secs(
                env.parsed("QUOTE_FANOUT_STARTUP_TIMEOUT_SECS", 15)?,
            ),
            metrics_port: env.parsed("QUOTE_FANOUT_METRICS_PORT", 9091)?,
            endpoints,
        })
    }
}

/// Configuration error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    Invalid {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

/// Parse `SYMBOL:CODE` pairs separated by commas.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for a pair without both halves and
/// [`ConfigError::EmptyValue`] when no pairs are given.
pub fn parse_instruments(raw: &str) -> Result<Vec<Instrument>, ConfigError> {
    const KEY: &str = "QUOTE_FANOUT_INSTRUMENTS";

    let instruments = list_items(raw)
        .map(|item| match item.split_once(':') {
            Some((symbol, code)) if !symbol.trim().is_empty() && !code.trim().is_empty() => {
                Ok(Instrument::new(symbol.trim(), code.trim()))
            }
            _ => Err(ConfigError::Invalid {
                key: KEY.to_string(),
                value: item.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if instruments.is_empty() {
        return Err(ConfigError::EmptyValue(KEY.to_string()));
    }
    Ok(instruments)
}

/// Parse comma-separated subscriber names.
///
/// # Errors
///
/// Returns [`ConfigError::EmptyValue`] when no names are given.
pub fn parse_subscribers(raw: &str) -> Result<Vec<Subscriber>, ConfigError> {
    let subscribers: Vec<Subscriber> = list_items(raw).map(Subscriber::new).collect();
    if subscribers.is_empty() {
        return Err(ConfigError::EmptyValue(
            "QUOTE_FANOUT_SUBSCRIBERS".to_string(),
        ));
    }
    Ok(subscribers)
}

fn list_items(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value)
    }

    fn string(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        match (self.0)(key) {
            None => Ok(default.to_string()),
            Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
            Some(v) => Ok(v),
        }
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match (self.0)(key) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: v,
            }),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match (self.0)(key) {
            None => Ok(default),
            Some(v) => match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    key: key.to_string(),
                    value: v,
                }),
            },
        }
    }
}
