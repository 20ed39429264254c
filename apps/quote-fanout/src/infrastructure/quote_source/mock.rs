//! Scripted quote source for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::quote::Quote;

use super::binance::quote_from_body;

type FetchHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct State {
    bodies: HashMap<String, Result<Value, QuoteSourceError>>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
    hook: Option<FetchHook>,
}

/// In-process quote source with per-symbol scripted answers.
///
/// Symbols without a script fail with a network error.
#[derive(Default)]
pub struct MockQuoteSource {
    state: Mutex<State>,
}

impl std::fmt::Debug for MockQuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockQuoteSource")
            .field("symbols", &state.bodies.keys().collect::<Vec<_>>())
            .field("calls", &state.calls)
            .finish_non_exhaustive()
    }
}

impl MockQuoteSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `symbol` with a ticker body carrying `price` as text.
    pub fn set_price(&self, symbol: &str, price: &str) {
        self.set_body(symbol, json!({"symbol": symbol, "price": price}));
    }

    /// Answer `symbol` with an arbitrary body.
    pub fn set_body(&self, symbol: &str, body: Value) {
        self.state.lock().bodies.insert(symbol.to_string(), Ok(body));
    }

    /// Fail every fetch of `symbol`.
    pub fn set_failure(&self, symbol: &str, error: QuoteSourceError) {
        self.state.lock().bodies.insert(symbol.to_string(), Err(error));
    }

    /// Delay every fetch of `symbol`.
    pub fn set_delay(&self, symbol: &str, delay: Duration) {
        self.state.lock().delays.insert(symbol.to_string(), delay);
    }

    /// Run `hook` at the start of every fetch.
    pub fn on_fetch<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.state.lock().hook = Some(Arc::new(hook));
    }

    /// Number of fetches for `symbol` so far.
    #[must_use]
    pub fn calls(&self, symbol: &str) -> usize {
        self.state.lock().calls.get(symbol).copied().unwrap_or(0)
    }

    /// Number of fetches across all symbols.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }
}

#[async_trait]
impl QuoteSourcePort for MockQuoteSource {
    async fn fetch(&self, symbol: &str) -> Result<Quote, QuoteSourceError> {
        let (hook, delay, scripted) = {
            let mut state = self.state.lock();
            *state.calls.entry(symbol.to_string()).or_default() += 1;
            (
                state.hook.clone(),
                state.delays.get(symbol).copied(),
                state.bodies.get(symbol).cloned(),
            )
        };

        if let Some(hook) = hook {
            hook(symbol);
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(Ok(body)) => quote_from_body(symbol, body),
            Some(Err(e)) => Err(e),
            None => Err(QuoteSourceError::Network {
                message: format!("no quote scripted for {symbol}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_answers_and_counts() {
        let source = MockQuoteSource::new();
        source.set_price("BTCUSDT", "50000.00");
        source.set_failure(
            "ETHUSDT",
            QuoteSourceError::Status {
                code: 503,
                body: String::new(),
            },
        );

        assert_eq!(source.fetch("BTCUSDT").await.unwrap().cache_value(), "50000.00");
        assert!(matches!(
            source.fetch("ETHUSDT").await,
            Err(QuoteSourceError::Status { code: 503, .. })
        ));
        assert!(matches!(
            source.fetch("SOLUSDT").await,
            Err(QuoteSourceError::Network { .. })
        ));

        assert_eq!(source.calls("BTCUSDT"), 1);
        assert_eq!(source.total_calls(), 3);
    }
}
