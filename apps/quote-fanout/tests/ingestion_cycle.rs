//! Ingestion Cycle Integration Tests
//!
//! End-to-end cycles over the in-memory adapters: cache-aside resolution,
//! fan-out, failure isolation, and timeouts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use quote_fanout::infrastructure::cache::{CacheWrite, InMemoryQuoteCache};
use quote_fanout::infrastructure::persistence::{
    InMemoryEventStore, InMemorySubscriptionGraph, InMemoryTimeSeriesStore,
};
use quote_fanout::infrastructure::quote_source::MockQuoteSource;
use quote_fanout::{
    Backends, Direction, IngestSettings, IngestionCycle, Instrument, LastPriceMemory,
    PriceOrigin, QuoteCachePort, QuoteSourceError, ResolveError, StoreError, StoreKind,
    Subscriber, SubscriptionGraphPort, SubscriptionTopology, TimeSeriesPort, bootstrap,
};

struct Harness {
    source: Arc<MockQuoteSource>,
    cache: Arc<InMemoryQuoteCache>,
    time_series: Arc<InMemoryTimeSeriesStore>,
    events: Arc<InMemoryEventStore>,
    graph: Arc<InMemorySubscriptionGraph>,
    backends: Backends,
    memory: LastPriceMemory,
}

impl Harness {
    async fn new() -> Self {
        let source = Arc::new(MockQuoteSource::new());
        let cache = Arc::new(InMemoryQuoteCache::new());
        let time_series = Arc::new(InMemoryTimeSeriesStore::new());
        let events = Arc::new(InMemoryEventStore::new());
        let graph = Arc::new(InMemorySubscriptionGraph::new());

        let backends = Backends {
            source: source.clone(),
            cache: cache.clone(),
            time_series: time_series.clone(),
            events: events.clone(),
            graph: graph.clone(),
        };

        bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap();

        Self {
            source,
            cache,
            time_series,
            events,
            graph,
            backends,
            memory: LastPriceMemory::new(),
        }
    }

    async fn run(&self, settings: IngestSettings) -> quote_fanout::CycleReport {
        IngestionCycle::new(settings)
            .run(
                &self.backends,
                &self.memory,
                &instruments(),
                &CancellationToken::new(),
            )
            .await
    }
}

fn instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("BTCUSDT", "BTC"),
        Instrument::new("ETHUSDT", "ETH"),
    ]
}

fn topology() -> SubscriptionTopology {
    SubscriptionTopology::full_mesh(
        &instruments(),
        &[
            Subscriber::new("Paulo"),
            Subscriber::new("Ana"),
            Subscriber::new("João"),
        ],
    )
}

fn watchers() -> Vec<String> {
    vec!["Ana".to_string(), "João".to_string(), "Paulo".to_string()]
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn cache_miss_fetches_caches_and_fans_out() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    let btc = report.instrument("BTC").unwrap().fan_out().unwrap();
    assert_eq!(btc.origin, PriceOrigin::Source);
    assert_eq!(btc.price.to_string(), "50000.00");
    assert_eq!(btc.direction, Direction::Unknown);
    assert_eq!(btc.event_store, Ok(()));
    assert_eq!(btc.time_series, Ok(()));
    assert_eq!(btc.watchers, Ok(watchers()));

    assert_eq!(
        h.cache.writes()[0],
        CacheWrite {
            key: "quote:BTCUSDT".to_string(),
            value: "50000.00".to_string(),
            ttl: Duration::from_secs(8),
        }
    );

    let observations = h.time_series.recent("BTC", 10).await.unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].price, Decimal::new(5_000_000, 2));

    let document = &h.events.documents()[0];
    assert_eq!(document["symbol"], json!("BTCUSDT"));
    assert_eq!(document["price"], json!("50000.00"));
    assert!(document["collected_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn cache_hit_never_calls_source() {
    let h = Harness::new().await;
    h.cache
        .seed("quote:ETHUSDT", "3000.00", Duration::from_secs(8));
    h.source.set_price("BTCUSDT", "50000.00");

    let report = h.run(IngestSettings::default()).await;

    assert_eq!(h.source.calls("ETHUSDT"), 0);
    let eth = report.instrument("ETH").unwrap().fan_out().unwrap();
    assert_eq!(eth.origin, PriceOrigin::Cache);
    assert_eq!(eth.price, Decimal::new(300_000, 2));

    // Only the BTC miss was written back
    assert_eq!(h.cache.writes().len(), 1);

    let eth_rows = h.time_series.recent("ETH", 10).await.unwrap();
    assert_eq!(eth_rows[0].price.to_string(), "3000.00");
}

#[tokio::test]
async fn source_failure_skips_instrument_and_continues() {
    let h = Harness::new().await;
    h.source.set_failure(
        "BTCUSDT",
        QuoteSourceError::Network {
            message: "connection refused".to_string(),
        },
    );
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    let btc = report.instrument("BTC").unwrap();
    assert!(matches!(btc.skip_reason(), Some(ResolveError::Source(_))));
    assert!(report.instrument("ETH").unwrap().fan_out().is_some());

    // Nothing was written for BTC; only ETH reached the stores
    assert!(h.cache.writes().iter().all(|w| w.key == "quote:ETHUSDT"));
    assert!(h.time_series.recent("BTC", 10).await.unwrap().is_empty());
    assert_eq!(h.events.len(), 1);
    assert_eq!(h.graph.lookups(), 1);
    assert!(h.memory.get("BTC").is_none());
}

#[tokio::test]
async fn corrupt_cache_entry_skips_instrument() {
    let h = Harness::new().await;
    h.cache
        .seed("quote:BTCUSDT", "garbage", Duration::from_secs(8));
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    assert!(matches!(
        report.instrument("BTC").unwrap().skip_reason(),
        Some(ResolveError::CorruptCacheEntry { .. })
    ));
    assert_eq!(h.source.calls("BTCUSDT"), 0);
    assert_eq!(report.ingested(), 1);
}

#[tokio::test]
async fn cache_outage_falls_back_to_source() {
    let h = Harness::new().await;
    h.cache.set_available(false);
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    assert_eq!(report.ingested(), 2);
    let btc = report.instrument("BTC").unwrap().fan_out().unwrap();
    assert_eq!(btc.origin, PriceOrigin::Source);
    // Read and write both failed
    assert_eq!(btc.cache_errors.len(), 2);
    assert_eq!(h.time_series.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_value_expires_after_ttl() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    h.run(IngestSettings::default()).await;
    assert_eq!(
        h.cache.get("quote:BTCUSDT").await.unwrap().as_deref(),
        Some("50000.00")
    );

    tokio::time::advance(Duration::from_secs(5)).await;
    h.run(IngestSettings::default()).await;
    assert_eq!(h.source.calls("BTCUSDT"), 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    h.run(IngestSettings::default()).await;
    assert_eq!(h.source.calls("BTCUSDT"), 2);
}

// =============================================================================
// Trend
// =============================================================================

#[tokio::test(start_paused = true)]
async fn trend_follows_memory_across_cycles() {
    let h = Harness::new().await;
    let settings = IngestSettings {
        cache_ttl: Duration::from_secs(1),
        ..IngestSettings::default()
    };
    h.source.set_price("ETHUSDT", "3000.00");

    let mut directions = Vec::new();
    for price in ["100", "110", "100", "100.00"] {
        h.source.set_price("BTCUSDT", price);
        let report = h.run(settings.clone()).await;
        directions.push(report.instrument("BTC").unwrap().fan_out().unwrap().direction);
        tokio::time::advance(Duration::from_secs(2)).await;
    }

    assert_eq!(
        directions,
        vec![
            Direction::Unknown,
            Direction::Up,
            Direction::Down,
            Direction::Flat
        ]
    );
}

// =============================================================================
// Failure isolation
// =============================================================================

#[tokio::test]
async fn time_series_outage_does_not_block_other_stores() {
    let h = Harness::new().await;
    h.time_series.set_available(false);
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    let btc = report.instrument("BTC").unwrap().fan_out().unwrap();
    assert!(matches!(
        btc.time_series,
        Err(StoreError::Unavailable {
            store: StoreKind::TimeSeries,
            ..
        })
    ));
    assert_eq!(btc.event_store, Ok(()));
    assert_eq!(btc.watchers, Ok(watchers()));

    assert_eq!(h.events.len(), 2);
    assert_eq!(h.graph.lookups(), 2);
    assert_eq!(report.store_failures().count(), 2);
}

#[tokio::test]
async fn graph_outage_still_persists() {
    let h = Harness::new().await;
    h.graph.set_available(false);
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    let eth = report.instrument("ETH").unwrap().fan_out().unwrap();
    assert!(eth.watchers.is_err());
    assert_eq!(h.time_series.len(), 2);
    assert_eq!(h.events.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_without_delaying_others() {
    let h = Harness::new().await;
    h.events.set_latency(Some(Duration::from_secs(60)));
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");

    let settings = IngestSettings {
        call_timeout: Duration::from_millis(500),
        ..IngestSettings::default()
    };
    let report = h.run(settings).await;

    let btc = report.instrument("BTC").unwrap().fan_out().unwrap();
    assert_eq!(
        btc.event_store,
        Err(StoreError::Timeout {
            store: StoreKind::EventStore,
            after: Duration::from_millis(500),
        })
    );
    assert_eq!(btc.time_series, Ok(()));
    assert!(h.events.is_empty());
    assert!(report.duration < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn slow_source_is_skipped() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_delay("BTCUSDT", Duration::from_secs(30));
    h.source.set_price("ETHUSDT", "3000.00");

    let report = h.run(IngestSettings::default()).await;

    assert_eq!(
        report.instrument("BTC").unwrap().skip_reason(),
        Some(&ResolveError::SourceTimeout {
            after: Duration::from_secs(5)
        })
    );
    assert!(h.cache.writes().iter().all(|w| w.key != "quote:BTCUSDT"));
    assert_eq!(report.ingested(), 1);
}

// =============================================================================
// Graph
// =============================================================================

#[tokio::test]
async fn graph_provisioning_is_idempotent() {
    let h = Harness::new().await;
    let before = h.graph.counts().await.unwrap();

    bootstrap(&h.backends, &topology(), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(h.graph.counts().await.unwrap(), before);
    assert_eq!(before.watches, 6);
    assert_eq!(h.graph.watchers("BTC").await.unwrap(), watchers());
}

#[tokio::test]
async fn instrument_without_watchers_is_not_an_error() {
    let h = Harness::new().await;
    h.source.set_price("SOLUSDT", "150.25");

    let report = IngestionCycle::default()
        .run(
            &h.backends,
            &h.memory,
            &[Instrument::new("SOLUSDT", "SOL")],
            &CancellationToken::new(),
        )
        .await;

    let sol = report.instrument("SOL").unwrap().fan_out().unwrap();
    assert_eq!(sol.watchers, Ok(vec![]));
    assert_eq!(report.store_failures().count(), 0);
}

// =============================================================================
// Parallel mode and cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn parallel_mode_overlaps_instruments() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_delay("BTCUSDT", Duration::from_secs(2));
    h.source.set_price("ETHUSDT", "3000.00");
    h.source.set_delay("ETHUSDT", Duration::from_secs(2));

    let settings = IngestSettings {
        parallel: true,
        ..IngestSettings::default()
    };
    let started = tokio::time::Instant::now();
    let report = h.run(settings).await;

    assert_eq!(report.ingested(), 2);
    assert!(started.elapsed() < Duration::from_secs(4));
    // Reports keep configuration order
    assert_eq!(report.instruments[0].instrument_code, "BTC");
    assert_eq!(report.instruments[1].instrument_code, "ETH");
}

#[tokio::test]
async fn cancelled_token_visits_nothing() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    let cancel = CancellationToken::new();
    cancel.cancel();

    for parallel in [false, true] {
        let report = IngestionCycle::new(IngestSettings {
            parallel,
            ..IngestSettings::default()
        })
        .run(&h.backends, &h.memory, &instruments(), &cancel)
        .await;

        assert!(report.cancelled);
        assert!(report.instruments.is_empty());
    }
    assert_eq!(h.source.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn parallel_cancellation_keeps_finished_instruments() {
    let h = Harness::new().await;
    h.source.set_price("BTCUSDT", "50000.00");
    h.source.set_price("ETHUSDT", "3000.00");
    h.source.set_delay("ETHUSDT", Duration::from_secs(3));

    let cycle = IngestionCycle::new(IngestSettings {
        parallel: true,
        ..IngestSettings::default()
    });
    let cancel = CancellationToken::new();
    let trigger = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    };

    let instruments = instruments();
    let (report, ()) = tokio::join!(
        cycle.run(&h.backends, &h.memory, &instruments, &cancel),
        trigger
    );

    assert!(report.cancelled);
    assert_eq!(report.instruments.len(), 1);
    let btc = report.instrument("BTC").unwrap().fan_out().unwrap();
    assert_eq!(btc.price.to_string(), "50000.00");
    assert!(report.instrument("ETH").is_none());

    // What the report shows matches what reached the stores
    assert_eq!(h.time_series.len(), 1);
    assert_eq!(h.events.len(), 1);
    assert_eq!(h.memory.get("BTC"), Some(Decimal::new(5_000_000, 2)));
    assert!(h.memory.get("ETH").is_none());
}
