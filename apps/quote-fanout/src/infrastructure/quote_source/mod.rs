//! Quote source adapters.

mod binance;
mod mock;

pub use binance::{BinanceQuoteSource, quote_from_body};
pub use mock::MockQuoteSource;
