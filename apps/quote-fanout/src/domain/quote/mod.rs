//! Quotes and Observations
//!
//! A [`Quote`] lives for exactly one cycle: it is produced by the resolver and
//! consumed by the fan-out. What survives the cycle is written to the stores
//! as a [`PriceObservation`] (time-series) and a [`RawEvent`] (event store).

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Opaque key-value payload as received from the quote source.
pub type Payload = Map<String, Value>;

/// Key added to raw event documents holding the collection timestamp.
pub const COLLECTED_AT_FIELD: &str = "collected_at";

/// A price that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The text is not a decimal number.
    #[error("not a decimal price: {0:?}")]
    NotDecimal(String),

    /// The number is negative.
    #[error("negative price: {0}")]
    Negative(Decimal),
}

/// Parse a textual price.
///
/// Only plain decimals are accepted: an optional `-`, digits, and an optional
/// fraction. The scale of the input is preserved, so `"50000.00"` parses to a
/// decimal whose `to_string()` is `"50000.00"` again.
pub fn parse_price(text: &str) -> Result<Decimal, PriceError> {
    if !is_plain_decimal(text) {
        return Err(PriceError::NotDecimal(text.to_string()));
    }
    let price = Decimal::from_str(text).map_err(|_| PriceError::NotDecimal(text.to_string()))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(PriceError::Negative(price));
    }
    Ok(price)
}

fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.is_none_or(digits)
}

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrigin {
    /// Served from a still-fresh cache entry.
    Cache,
    /// Fetched from the external quote source.
    Source,
}

impl PriceOrigin {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Source => "source",
        }
    }
}

/// A current price for one instrument, with the payload it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Market symbol the quote is for.
    pub instrument_symbol: String,
    /// Parsed price.
    pub price: Decimal,
    /// Source payload (or a synthesized one on a cache hit).
    pub payload: Payload,
}

impl Quote {
    /// Build a quote from a parsed price and its raw payload.
    #[must_use]
    pub fn new(instrument_symbol: impl Into<String>, price: Decimal, payload: Payload) -> Self {
        Self {
            instrument_symbol: instrument_symbol.into(),
            price,
            payload,
        }
    }

    /// Rebuild a quote from a cached price text.
    ///
    /// The cache only keeps the price, so the payload carries the symbol and
    /// the cached text.
    #[must_use]
    pub fn from_cached(instrument_symbol: &str, price: Decimal, cached: &str) -> Self {
        let mut payload = Payload::new();
        payload.insert("symbol".to_string(), Value::String(instrument_symbol.to_string()));
        payload.insert("price".to_string(), Value::String(cached.to_string()));
        Self::new(instrument_symbol, price, payload)
    }

    /// Text written to the cache for this quote.
    ///
    /// Prefers the literal price string from the payload so the cached value
    /// matches what the source sent.
    #[must_use]
    pub fn cache_value(&self) -> String {
        match self.payload.get("price") {
            Some(Value::String(text)) => text.clone(),
            _ => self.price.to_string(),
        }
    }
}

/// One time-series record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Instrument display code.
    pub instrument_code: String,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
    /// Observed price.
    pub price: Decimal,
}

impl PriceObservation {
    /// Create a new observation.
    #[must_use]
    pub fn new(instrument_code: impl Into<String>, observed_at: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            instrument_code: instrument_code.into(),
            observed_at,
            price,
        }
    }
}

/// One raw event-store record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Quote payload as received.
    pub payload: Payload,
    /// Ingestion time.
    pub collected_at: DateTime<Utc>,
}

impl RawEvent {
    /// Capture a quote's payload at the given time.
    #[must_use]
    pub fn capture(quote: &Quote, collected_at: DateTime<Utc>) -> Self {
        Self {
            payload: quote.payload.clone(),
            collected_at,
        }
    }

    /// Payload plus the `collected_at` field, ready to store as a document.
    #[must_use]
    pub fn to_document(&self) -> Payload {
        let mut document = self.payload.clone();
        document.insert(
            COLLECTED_AT_FIELD.to_string(),
            Value::String(self.collected_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        document
    }
}
