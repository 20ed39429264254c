//! Startup checks and provisioning.
//!
//! Runs once before the first cycle. Any failure here is fatal and names the
//! dependency that could not be reached.

use std::future::Future;
use std::time::Duration;

use tracing::info;

use super::{Backends, bounded};
use crate::application::ports::{GraphCounts, StoreError, StoreKind};
use crate::domain::instrument::SubscriptionTopology;

/// A dependency could not be reached or provisioned at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("startup failed at {dependency}: {source}")]
pub struct StartupError {
    /// Dependency that failed.
    pub dependency: StoreKind,
    /// Underlying failure.
    #[source]
    pub source: StoreError,
}

impl StartupError {
    fn at(dependency: StoreKind) -> impl FnOnce(StoreError) -> Self {
        move |source| Self { dependency, source }
    }
}

/// Run one startup step against `dependency`, bounded by `limit`.
///
/// # Errors
///
/// Returns [`StartupError`] naming `dependency` if the step fails or does not
/// finish in time.
pub async fn startup_step<T, F>(
    dependency: StoreKind,
    limit: Duration,
    step: F,
) -> Result<T, StartupError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    bounded(dependency, limit, step)
        .await
        .map_err(StartupError::at(dependency))
}

/// Verify the cache, create storage structures, and seed the graph.
///
/// Every step is idempotent, so restarting against provisioned stores is a
/// no-op. Returns the graph totals after seeding.
///
/// # Errors
///
/// Returns [`StartupError`] naming the first dependency that failed.
pub async fn bootstrap(
    backends: &Backends,
    topology: &SubscriptionTopology,
    limit: Duration,
) -> Result<GraphCounts, StartupError> {
    startup_step(StoreKind::Cache, limit, backends.cache.ping()).await?;
    info!("Cache reachable");

    startup_step(StoreKind::TimeSeries, limit, backends.time_series.provision()).await?;
    info!("Price history ready");

    startup_step(StoreKind::EventStore, limit, backends.events.provision()).await?;
    info!("Event store ready");

    let graph = StoreKind::SubscriptionGraph;
    startup_step(graph, limit, backends.graph.provision(topology)).await?;
    let counts = startup_step(graph, limit, backends.graph.counts()).await?;

    info!(
        instruments = counts.instruments,
        subscribers = counts.subscribers,
        watches = counts.watches,
        "Subscription graph provisioned"
    );

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::{Instrument, Subscriber};
    use crate::infrastructure::cache::InMemoryQuoteCache;
    use crate::infrastructure::persistence::{
        InMemoryEventStore, InMemorySubscriptionGraph, InMemoryTimeSeriesStore,
    };
    use crate::infrastructure::quote_source::MockQuoteSource;
    use std::sync::Arc;

    fn topology() -> SubscriptionTopology {
        SubscriptionTopology::full_mesh(
            &[
                Instrument::new("BTCUSDT", "BTC"),
                Instrument::new("ETHUSDT", "ETH"),
            ],
            &[
                Subscriber::new("Paulo"),
                Subscriber::new("Ana"),
                Subscriber::new("João"),
            ],
        )
    }

    fn backends(cache: Arc<InMemoryQuoteCache>, events: Arc<InMemoryEventStore>) -> Backends {
        Backends {
            source: Arc::new(MockQuoteSource::new()),
            cache,
            time_series: Arc::new(InMemoryTimeSeriesStore::new()),
            events,
            graph: Arc::new(InMemorySubscriptionGraph::new()),
        }
    }

    #[tokio::test]
    async fn provisions_full_mesh() {
        let backends = backends(
            Arc::new(InMemoryQuoteCache::new()),
            Arc::new(InMemoryEventStore::new()),
        );

        let counts = bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(
            counts,
            GraphCounts {
                instruments: 2,
                subscribers: 3,
                watches: 6,
            }
        );
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let backends = backends(
            Arc::new(InMemoryQuoteCache::new()),
            Arc::new(InMemoryEventStore::new()),
        );

        let first = bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap();
        let second = bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unreachable_cache_is_named() {
        let cache = Arc::new(InMemoryQuoteCache::new());
        cache.set_available(false);
        let backends = backends(cache, Arc::new(InMemoryEventStore::new()));

        let err = bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.dependency, StoreKind::Cache);
        assert!(err.to_string().starts_with("startup failed at cache"));
    }

    #[tokio::test]
    async fn event_store_failure_stops_before_graph() {
        let events = Arc::new(InMemoryEventStore::new());
        events.set_available(false);
        let backends = backends(Arc::new(InMemoryQuoteCache::new()), events);

        let err = bootstrap(&backends, &topology(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.dependency, StoreKind::EventStore);
        assert_eq!(backends.graph.counts().await.unwrap(), GraphCounts::default());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_step_times_out_naming_dependency() {
        let limit = Duration::from_secs(15);

        let err = startup_step(
            StoreKind::TimeSeries,
            limit,
            std::future::pending::<Result<(), StoreError>>(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            StartupError {
                dependency: StoreKind::TimeSeries,
                source: StoreError::Timeout {
                    store: StoreKind::TimeSeries,
                    after: limit,
                },
            }
        );
    }

    #[tokio::test]
    async fn failed_step_keeps_store_error() {
        let err = startup_step(StoreKind::Cache, Duration::from_secs(1), async {
            Err::<(), _>(StoreError::unavailable(StoreKind::Cache, "connection refused"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.dependency, StoreKind::Cache);
        assert!(matches!(err.source, StoreError::Unavailable { .. }));
    }
}
