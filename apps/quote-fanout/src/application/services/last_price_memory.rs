//! Last-seen price per instrument.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Process-local memory of the price each instrument had in its previous
/// cycle.
///
/// Created empty at startup and never persisted. Instruments only touch their
/// own key, so concurrent cycles for different instruments never contend on
/// the same entry.
#[derive(Debug, Default)]
pub struct LastPriceMemory {
    prices: Mutex<HashMap<String, Decimal>>,
}

impl LastPriceMemory {
    /// Create an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `price` for `instrument_code`, returning the previous price.
    pub fn record(&self, instrument_code: &str, price: Decimal) -> Option<Decimal> {
        self.prices.lock().insert(instrument_code.to_string(), price)
    }

    /// Last recorded price for an instrument.
    #[must_use]
    pub fn get(&self, instrument_code: &str) -> Option<Decimal> {
        self.prices.lock().get(instrument_code).copied()
    }

    /// Number of instruments with a recorded price.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.lock().len()
    }

    /// True if no price has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.lock().is_empty()
    }
}
