//! Quote Source Port (Driven Port)
//!
//! Interface for fetching the current price of a market symbol from an
//! external, untrusted provider.

use async_trait::async_trait;

use crate::domain::quote::Quote;

/// Why a quote could not be fetched.
///
/// All variants mean the same thing to the cycle: no quote this time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteSourceError {
    /// Transport failure (DNS, connect, reset, client timeout).
    #[error("quote source network error: {message}")]
    Network {
        /// Error details.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("quote source returned status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Body is not a JSON object or has no price field.
    #[error("malformed quote body: {message}")]
    MalformedBody {
        /// Error details.
        message: String,
    },

    /// Price field present but not an acceptable price.
    #[error("invalid price in quote: {value:?}")]
    InvalidPrice {
        /// The offending value as received.
        value: String,
    },
}

/// Port for fetching current quotes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Fetch the current quote for a market symbol.
    async fn fetch(&self, symbol: &str) -> Result<Quote, QuoteSourceError>;
}
