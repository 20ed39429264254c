//! Binance public ticker adapter.
//!
//! `GET {base}/api/v3/ticker/price?symbol=BTCUSDT` answers with
//! `{"symbol":"BTCUSDT","price":"50000.00"}`. The price arrives as text and is
//! parsed without going through a float.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::quote::{Payload, Quote, parse_price};

const TICKER_PATH: &str = "/api/v3/ticker/price";

/// Binance REST quote source.
///
/// Implements `QuoteSourcePort` against the public ticker endpoint.
#[derive(Debug, Clone)]
pub struct BinanceQuoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceQuoteSource {
    /// Create a new adapter.
    ///
    /// `timeout` bounds each request at the HTTP client level.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QuoteSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteSourceError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full ticker URL without the query string.
    #[must_use]
    pub fn ticker_url(&self) -> String {
        format!("{}{TICKER_PATH}", self.base_url)
    }
}

#[async_trait]
impl QuoteSourcePort for BinanceQuoteSource {
    async fn fetch(&self, symbol: &str) -> Result<Quote, QuoteSourceError> {
        let response = self
            .client
            .get(self.ticker_url())
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| QuoteSourceError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteSourceError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| QuoteSourceError::MalformedBody {
                message: e.to_string(),
            })?;

        quote_from_body(symbol, body)
    }
}

/// Turn a ticker response body into a quote.
///
/// The whole object is kept as the payload. `price` may be a JSON string or a
/// JSON number; either way the literal text is what gets parsed.
///
/// # Errors
///
/// Returns `MalformedBody` if the body is not an object or has no price, and
/// `InvalidPrice` if the price does not parse.
pub fn quote_from_body(symbol: &str, body: Value) -> Result<Quote, QuoteSourceError> {
    let Value::Object(payload) = body else {
        return Err(QuoteSourceError::MalformedBody {
            message: "expected a JSON object".to_string(),
        });
    };

    let text = price_text(&payload)?;
    let price = parse_price(&text).map_err(|_| QuoteSourceError::InvalidPrice { value: text })?;

    Ok(Quote::new(symbol, price, payload))
}

fn price_text(payload: &Payload) -> Result<String, QuoteSourceError> {
    match payload.get("price") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(QuoteSourceError::InvalidPrice {
            value: other.to_string(),
        }),
        None => Err(QuoteSourceError::MalformedBody {
            message: "missing price field".to_string(),
        }),
    }
}
