//! Instruments and Subscribers
//!
//! The instrument set and the subscriber set are fixed for the lifetime of
//! the process. Both come from static configuration and never change while
//! the scheduler is running.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A tradable instrument sampled every cycle.
///
/// `symbol` is the market pair code used by the quote source and the cache
/// key (e.g. `BTCUSDT`). `code` is the short display code used by the
/// time-series store and the subscription graph (e.g. `BTC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    symbol: String,
    code: String,
}

impl Instrument {
    /// Create a new instrument.
    #[must_use]
    pub fn new(symbol: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            code: code.into(),
        }
    }

    /// Market symbol (exchange pair code).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Short display code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Cache key for this instrument's latest quote.
    #[must_use]
    pub fn cache_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.symbol)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.symbol)
    }
}

/// A named party interested in one or more instruments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subscriber(String);

impl Subscriber {
    /// Create a new subscriber.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Subscriber name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A single "watches" edge from a subscriber to an instrument code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Watch {
    /// Subscriber name.
    pub subscriber: String,
    /// Instrument code being watched.
    pub instrument_code: String,
}

/// Everything the subscription graph is seeded with at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionTopology {
    /// Instrument codes (graph nodes).
    pub instrument_codes: Vec<String>,
    /// Subscriber names (graph nodes).
    pub subscriber_names: Vec<String>,
    /// Watch edges.
    pub watches: Vec<Watch>,
}

impl SubscriptionTopology {
    /// Every subscriber watches every instrument.
    #[must_use]
    pub fn full_mesh(instruments: &[Instrument], subscribers: &[Subscriber]) -> Self {
        let instrument_codes: Vec<String> = dedup(instruments.iter().map(|i| i.code().to_string()));
        let subscriber_names: Vec<String> = dedup(subscribers.iter().map(|s| s.name().to_string()));

        let watches = subscriber_names
            .iter()
            .flat_map(|subscriber| {
                instrument_codes.iter().map(move |code| Watch {
                    subscriber: subscriber.clone(),
                    instrument_code: code.clone(),
                })
            })
            .collect();

        Self {
            instrument_codes,
            subscriber_names,
            watches,
        }
    }

    /// Subscriber names watching the given instrument code, sorted.
    #[must_use]
    pub fn watchers_of(&self, instrument_code: &str) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .watches
            .iter()
            .filter(|w| w.instrument_code == instrument_code)
            .map(|w| w.subscriber.as_str())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}

/// Keep first occurrence order, drop repeats.
fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruments() -> Vec<Instrument> {
        vec![
            Instrument::new("BTCUSDT", "BTC"),
            Instrument::new("ETHUSDT", "ETH"),
        ]
    }

    #[test]
    fn cache_key_uses_symbol() {
        let btc = Instrument::new("BTCUSDT", "BTC");
        assert_eq!(btc.cache_key("quote:"), "quote:BTCUSDT");
    }

    #[test]
    fn display_shows_code_and_symbol() {
        let btc = Instrument::new("BTCUSDT", "BTC");
        assert_eq!(btc.to_string(), "BTC (BTCUSDT)");
    }

    #[test]
    fn full_mesh_connects_everyone() {
        let subscribers = vec![Subscriber::new("Paulo"), Subscriber::new("Ana")];
        let topology = SubscriptionTopology::full_mesh(&instruments(), &subscribers);

        assert_eq!(topology.instrument_codes, vec!["BTC", "ETH"]);
        assert_eq!(topology.subscriber_names, vec!["Paulo", "Ana"]);
        assert_eq!(topology.watches.len(), 4);
        assert_eq!(topology.watchers_of("BTC"), vec!["Ana", "Paulo"]);
        assert!(topology.watchers_of("DOGE").is_empty());
    }

    #[test]
    fn full_mesh_ignores_duplicates() {
        let subscribers = vec![Subscriber::new("Ana"), Subscriber::new("Ana")];
        let mut instruments = instruments();
        instruments.push(Instrument::new("BTCUSDT", "BTC"));

        let topology = SubscriptionTopology::full_mesh(&instruments, &subscribers);

        assert_eq!(topology.instrument_codes.len(), 2);
        assert_eq!(topology.subscriber_names.len(), 1);
        assert_eq!(topology.watches.len(), 2);
    }

    #[test]
    fn full_mesh_without_subscribers_has_no_edges() {
        let topology = SubscriptionTopology::full_mesh(&instruments(), &[]);
        assert_eq!(topology.instrument_codes.len(), 2);
        assert!(topology.watches.is_empty());
    }
}
