//! Cache-Aside Price Resolver
//!
//! Reads the cache first and only goes to the quote source on a miss. A
//! successful fetch is written back with the configured TTL.

use std::time::Duration;

use tracing::{debug, warn};

use super::bounded;
use super::ingestion_cycle::IngestSettings;
use crate::application::ports::{
    QuoteCachePort, QuoteSourceError, QuoteSourcePort, StoreError, StoreKind,
};
use crate::domain::instrument::Instrument;
use crate::domain::quote::{PriceError, PriceOrigin, Quote, parse_price};

/// A price that is safe to fan out.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuote {
    /// The quote to persist.
    pub quote: Quote,
    /// Where the price came from.
    pub origin: PriceOrigin,
    /// Cache read/write failures that did not prevent resolution.
    pub cache_errors: Vec<StoreError>,
}

/// No quote is available for this instrument this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The quote source failed.
    #[error(transparent)]
    Source(#[from] QuoteSourceError),

    /// The quote source did not answer in time.
    #[error("quote source timed out after {}ms", .after.as_millis())]
    SourceTimeout {
        /// Timeout that elapsed.
        after: Duration,
    },

    /// A cache entry exists but is not a usable price.
    #[error("cache entry {key} holds an invalid price {value:?}: {reason}")]
    CorruptCacheEntry {
        /// Cache key.
        key: String,
        /// Cached text.
        value: String,
        /// Parse failure.
        reason: PriceError,
    },
}

impl ResolveError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Source(_) => "source_error",
            Self::SourceTimeout { .. } => "source_timeout",
            Self::CorruptCacheEntry { .. } => "corrupt_cache_entry",
        }
    }
}

/// Cache-aside lookup over borrowed capabilities.
pub struct PriceResolver<'a> {
    cache: &'a dyn QuoteCachePort,
    source: &'a dyn QuoteSourcePort,
    settings: &'a IngestSettings,
}

impl<'a> PriceResolver<'a> {
    /// Create a resolver over a cache and a source.
    #[must_use]
    pub fn new(
        cache: &'a dyn QuoteCachePort,
        source: &'a dyn QuoteSourcePort,
        settings: &'a IngestSettings,
    ) -> Self {
        Self {
            cache,
            source,
            settings,
        }
    }

    /// Resolve the current price of an instrument.
    ///
    /// A fresh cache entry short-circuits the fetch. On a miss the source is
    /// called and, on success, exactly one cache write follows. A source
    /// failure leaves the cache untouched.
    pub async fn resolve(&self, instrument: &Instrument) -> Result<ResolvedQuote, ResolveError> {
        let key = instrument.cache_key(&self.settings.cache_prefix);
        let limit = self.settings.call_timeout;
        let mut cache_errors = Vec::new();

        match bounded(StoreKind::Cache, limit, self.cache.get(&key)).await {
            Ok(Some(cached)) => {
                let price = parse_price(&cached).map_err(|reason| {
                    ResolveError::CorruptCacheEntry {
                        key: key.clone(),
                        value: cached.clone(),
                        reason,
                    }
                })?;
                debug!(instrument = instrument.code(), %price, "cache hit");
                return Ok(ResolvedQuote {
                    quote: Quote::from_cached(instrument.symbol(), price, &cached),
                    origin: PriceOrigin::Cache,
                    cache_errors,
                });
            }
            Ok(None) => {
                debug!(instrument = instrument.code(), "cache miss");
            }
            Err(e) => {
                warn!(instrument = instrument.code(), error = %e, "cache read failed, fetching from source");
                cache_errors.push(e);
            }
        }

        let quote = match tokio::time::timeout(limit, self.source.fetch(instrument.symbol())).await
        {
            Ok(result) => result?,
            Err(_) => return Err(ResolveError::SourceTimeout { after: limit }),
        };

        let value = quote.cache_value();
        let ttl = self.settings.cache_ttl;
        match bounded(StoreKind::Cache, limit, self.cache.set_with_ttl(&key, &value, ttl)).await {
            Ok(()) => {
                debug!(instrument = instrument.code(), ttl_secs = ttl.as_secs(), "cache refreshed");
            }
            Err(e) => {
                warn!(instrument = instrument.code(), error = %e, "cache write failed");
                cache_errors.push(e);
            }
        }

        Ok(ResolvedQuote {
            quote,
            origin: PriceOrigin::Source,
            cache_errors,
        })
    }
}
