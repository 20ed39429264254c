//! Quote Fan-out Binary
//!
//! Starts the periodic quote ingestor.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-fanout
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL`: `PostgreSQL` URL shared by the stores
//!
//! ## Optional
//! - `TIMESERIES_DATABASE_URL`, `EVENTS_DATABASE_URL`, `GRAPH_DATABASE_URL`:
//!   per-store overrides of `DATABASE_URL`
//! - `REDIS_URL`: Cache URL (default: redis://localhost:6379)
//! - `QUOTE_SOURCE_BASE_URL`: Ticker API (default: <https://api.binance.com>)
//! - `QUOTE_FANOUT_INSTRUMENTS`: `SYMBOL:CODE` pairs (default: BTCUSDT:BTC,ETHUSDT:ETH)
//! - `QUOTE_FANOUT_SUBSCRIBERS`: Names (default: Paulo,Ana,João)
//! - `QUOTE_FANOUT_INTERVAL_SECS`: Pause between cycles (default: 10)
//! - `QUOTE_FANOUT_CACHE_TTL_SECS`: Cache expiry (default: 8)
//! - `QUOTE_FANOUT_CALL_TIMEOUT_MS`: Per-call timeout (default: 5000)
//! - `QUOTE_FANOUT_STARTUP_TIMEOUT_SECS`: Per-step startup timeout (default: 15)
//! - `QUOTE_FANOUT_CACHE_PREFIX`: Cache key prefix (default: quote:)
//! - `QUOTE_FANOUT_PARALLEL`: Process instruments concurrently (default: false)
//! - `QUOTE_FANOUT_METRICS_PORT`: Prometheus port, 0 disables (default: 9091)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quote_fanout::infrastructure::cache::RedisQuoteCache;
use quote_fanout::infrastructure::persistence::{
    PostgresEventStore, PostgresSubscriptionGraph, PostgresTimeSeriesStore,
};
use quote_fanout::infrastructure::quote_source::BinanceQuoteSource;
use quote_fanout::infrastructure::telemetry;
use quote_fanout::{
    Backends, IngestionCycle, IngestorConfig, Scheduler, StartupError, StoreKind,
    SubscriptionTopology, bootstrap, init_metrics, record_cycle, startup_step,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// How long a cycle in flight may take to wind down after a signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let telemetry_guard = telemetry::init()?;

    tracing::info!(
        otlp_export = telemetry_guard.is_exporting(),
        "Starting quote fan-out"
    );

    let config = IngestorConfig::from_env()?;
    log_config(&config);

    let _metrics_handle = init_metrics(config.metrics_port)?;

    let source = BinanceQuoteSource::new(
        &config.endpoints.quote_source_base_url,
        config.ingest.call_timeout,
    )
    .context("failed to build quote source client")?;
    let backends = connect(&config, source).await?;

    let topology = SubscriptionTopology::full_mesh(&config.instruments, &config.subscribers);
    bootstrap(&backends, &topology, config.startup_timeout).await?;

    let scheduler = Scheduler::new(
        backends,
        IngestionCycle::new(config.ingest.clone()),
        config.instruments.clone(),
        config.interval,
    );

    let shutdown_token = CancellationToken::new();
    let scheduler_token = shutdown_token.clone();
    let mut scheduler_task =
        tokio::spawn(async move { scheduler.run(&scheduler_token, record_cycle).await });

    tracing::info!("Quote fan-out ready");

    tokio::select! {
        () = await_shutdown(shutdown_token) => {}
        result = &mut scheduler_task => {
            let cycles = result.context("scheduler task failed")?;
            tracing::warn!(cycles, "Scheduler exited on its own");
            return Ok(());
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await {
        Ok(Ok(cycles)) => tracing::info!(cycles, "Quote fan-out stopped"),
        Ok(Err(e)) => return Err(e).context("scheduler task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Cycle did not finish before the shutdown timeout"
        ),
    }
    Ok(())
}

/// Connect every store. Each connection is bounded by the startup timeout,
/// and any failure names the dependency and aborts.
async fn connect(
    config: &IngestorConfig,
    source: BinanceQuoteSource,
) -> Result<Backends, StartupError> {
    let endpoints = &config.endpoints;
    let limit = config.startup_timeout;

    let cache = startup_step(
        StoreKind::Cache,
        limit,
        RedisQuoteCache::connect(&endpoints.redis_url),
    )
    .await?;
    let time_series = startup_step(
        StoreKind::TimeSeries,
        limit,
        PostgresTimeSeriesStore::connect(&endpoints.time_series_database_url),
    )
    .await?;
    let events = startup_step(
        StoreKind::EventStore,
        limit,
        PostgresEventStore::connect(&endpoints.events_database_url),
    )
    .await?;
    let graph = startup_step(
        StoreKind::SubscriptionGraph,
        limit,
        PostgresSubscriptionGraph::connect(&endpoints.graph_database_url),
    )
    .await?;

    Ok(Backends {
        source: Arc::new(source),
        cache: Arc::new(cache),
        time_series: Arc::new(time_series),
        events: Arc::new(events),
        graph: Arc::new(graph),
    })
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &IngestorConfig) {
    let instruments: Vec<String> = config.instruments.iter().map(ToString::to_string).collect();
    tracing::info!(
        instruments = %instruments.join(", "),
        subscribers = config.subscribers.len(),
        interval_secs = config.interval.as_secs(),
        cache_ttl_secs = config.ingest.cache_ttl.as_secs(),
        call_timeout_ms = u64::try_from(config.ingest.call_timeout.as_millis()).unwrap_or(u64::MAX),
        parallel = config.ingest.parallel,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(endpoints = ?config.endpoints, "Endpoints");
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
