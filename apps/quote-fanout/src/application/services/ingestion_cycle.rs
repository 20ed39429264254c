//! Ingestion Cycle
//!
//! One pass over every configured instrument:
//!
//! ```text
//! for each instrument:
//!   resolve (cache-aside)      ── no quote ──► skip to next instrument
//!   trend vs LastPriceMemory, then record the new price
//!   fan-out, concurrently and independently:
//!     ├─ EventStore.insert(RawEvent)
//!     ├─ TimeSeries.insert(PriceObservation)
//!     └─ SubscriptionGraph.watchers(code)
//! ```
//!
//! Store failures are captured per call in the report. Nothing is retried
//! within a cycle; the next cycle writes fresh data.

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Backends, LastPriceMemory, PriceResolver, ResolveError, bounded};
use crate::application::ports::{StoreError, StoreKind};
use crate::domain::instrument::Instrument;
use crate::domain::quote::{PriceObservation, PriceOrigin, RawEvent};
use crate::domain::trend::{Direction, trend};

/// Tunables for resolution and fan-out.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Prefix for cache keys (`<prefix><symbol>`).
    pub cache_prefix: String,
    /// Expiry for cache entries written after a fetch.
    pub cache_ttl: Duration,
    /// Upper bound for every single network call.
    pub call_timeout: Duration,
    /// Process instruments concurrently instead of one after another.
    pub parallel: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            cache_prefix: "quote:".to_string(),
            cache_ttl: Duration::from_secs(8),
            call_timeout: Duration::from_secs(5),
            parallel: false,
        }
    }
}

/// Results of the three fan-out attempts for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutReport {
    /// Price that was fanned out.
    pub price: Decimal,
    /// Where the price came from.
    pub origin: PriceOrigin,
    /// Direction against the previous cycle.
    pub direction: Direction,
    /// Non-fatal cache failures during resolution.
    pub cache_errors: Vec<StoreError>,
    /// Raw event append.
    pub event_store: Result<(), StoreError>,
    /// Price history insert.
    pub time_series: Result<(), StoreError>,
    /// Subscriber lookup.
    pub watchers: Result<Vec<String>, StoreError>,
}

impl FanOutReport {
    /// Every store failure recorded for this instrument.
    #[must_use]
    pub fn failures(&self) -> Vec<&StoreError> {
        let mut failures: Vec<&StoreError> = self.cache_errors.iter().collect();
        failures.extend(self.event_store.as_ref().err());
        failures.extend(self.time_series.as_ref().err());
        failures.extend(self.watchers.as_ref().err());
        failures
    }
}

/// What happened to one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    /// No quote was available; nothing was written.
    Skipped(ResolveError),
    /// A quote was resolved and fanned out.
    Ingested(Box<FanOutReport>),
}

/// Per-instrument entry of a cycle report.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    /// Instrument display code.
    pub instrument_code: String,
    /// Outcome.
    pub outcome: InstrumentOutcome,
}

impl InstrumentReport {
    /// Fan-out results, if the instrument was ingested.
    #[must_use]
    pub fn fan_out(&self) -> Option<&FanOutReport> {
        match &self.outcome {
            InstrumentOutcome::Ingested(report) => Some(report),
            InstrumentOutcome::Skipped(_) => None,
        }
    }

    /// Skip reason, if the instrument was skipped.
    #[must_use]
    pub const fn skip_reason(&self) -> Option<&ResolveError> {
        match &self.outcome {
            InstrumentOutcome::Skipped(reason) => Some(reason),
            InstrumentOutcome::Ingested(_) => None,
        }
    }
}

/// Summary of one pass over the instruments.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// One entry per visited instrument, in configuration order.
    pub instruments: Vec<InstrumentReport>,
    /// Cancellation stopped the pass before every instrument was visited.
    pub cancelled: bool,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl CycleReport {
    /// Entry for an instrument code.
    #[must_use]
    pub fn instrument(&self, code: &str) -> Option<&InstrumentReport> {
        self.instruments.iter().find(|r| r.instrument_code == code)
    }

    /// Number of instruments that were fanned out.
    #[must_use]
    pub fn ingested(&self) -> usize {
        self.instruments
            .iter()
            .filter(|r| r.fan_out().is_some())
            .count()
    }

    /// Number of instruments skipped for lack of a quote.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.instruments.len() - self.ingested()
    }

    /// All store failures across instruments.
    pub fn store_failures(&self) -> impl Iterator<Item = &StoreError> {
        self.instruments
            .iter()
            .filter_map(InstrumentReport::fan_out)
            .flat_map(FanOutReport::failures)
    }
}

/// The per-tick orchestrator.
#[derive(Debug, Clone, Default)]
pub struct IngestionCycle {
    settings: IngestSettings,
}

impl IngestionCycle {
    /// Create a cycle with the given settings.
    #[must_use]
    pub const fn new(settings: IngestSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Visit every instrument once.
    ///
    /// Cancellation is checked before each instrument (sequential mode) or
    /// raced against the instruments still in flight (parallel mode). Either
    /// way the report keeps every instrument that finished.
    pub async fn run(
        &self,
        backends: &Backends,
        memory: &LastPriceMemory,
        instruments: &[Instrument],
        cancel: &CancellationToken,
    ) -> CycleReport {
        let started = Instant::now();
        let mut reports = Vec::with_capacity(instruments.len());
        let mut cancelled = false;

        if self.settings.parallel {
            let mut pending: FuturesUnordered<_> = instruments
                .iter()
                .enumerate()
                .map(|(index, instrument)| async move {
                    (index, self.process(backends, memory, instrument).await)
                })
                .collect();

            // Instruments that finish before cancellation stay in the report
            let mut finished = Vec::with_capacity(instruments.len());
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    next = pending.next() => match next {
                        Some(done) => finished.push(done),
                        None => break,
                    },
                }
            }
            finished.sort_by_key(|(index, _)| *index);
            reports.extend(finished.into_iter().map(|(_, report)| report));
        } else {
            for instrument in instruments {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                reports.push(self.process(backends, memory, instrument).await);
            }
        }

        let report = CycleReport {
            instruments: reports,
            cancelled,
            duration: started.elapsed(),
        };

        info!(
            ingested = report.ingested(),
            skipped = report.skipped(),
            store_failures = report.store_failures().count(),
            cancelled,
            elapsed_secs = report.duration.as_secs_f64(),
            "Cycle finished"
        );

        report
    }

    /// Resolve, classify, and fan out a single instrument.
    pub async fn process(
        &self,
        backends: &Backends,
        memory: &LastPriceMemory,
        instrument: &Instrument,
    ) -> InstrumentReport {
        let code = instrument.code();
        let resolver = PriceResolver::new(
            backends.cache.as_ref(),
            backends.source.as_ref(),
            &self.settings,
        );

        let resolved = match resolver.resolve(instrument).await {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(instrument = code, symbol = instrument.symbol(), error = %reason, "No quote available, skipping");
                return InstrumentReport {
                    instrument_code: code.to_string(),
                    outcome: InstrumentOutcome::Skipped(reason),
                };
            }
        };

        let price = resolved.quote.price;
        let direction = trend(memory.record(code, price), price);
        info!(
            instrument = code,
            %price,
            origin = resolved.origin.as_str(),
            direction = direction.as_str(),
            "Quote resolved"
        );

        let now = Utc::now();
        let event = RawEvent::capture(&resolved.quote, now);
        let observation = PriceObservation::new(code, now, price);
        let limit = self.settings.call_timeout;

        let (event_store, time_series, watchers) = tokio::join!(
            bounded(StoreKind::EventStore, limit, backends.events.insert(&event)),
            bounded(
                StoreKind::TimeSeries,
                limit,
                backends.time_series.insert(&observation)
            ),
            bounded(
                StoreKind::SubscriptionGraph,
                limit,
                backends.graph.watchers(code)
            ),
        );

        log_fan_out(code, &event_store, &time_series, &watchers);

        InstrumentReport {
            instrument_code: code.to_string(),
            outcome: InstrumentOutcome::Ingested(Box::new(FanOutReport {
                price,
                origin: resolved.origin,
                direction,
                cache_errors: resolved.cache_errors,
                event_store,
                time_series,
                watchers,
            })),
        }
    }
}

fn log_fan_out(
    code: &str,
    event_store: &Result<(), StoreError>,
    time_series: &Result<(), StoreError>,
    watchers: &Result<Vec<String>, StoreError>,
) {
    for (store, result) in [
        (StoreKind::EventStore, event_store),
        (StoreKind::TimeSeries, time_series),
    ] {
        if let Err(e) = result {
            warn!(instrument = code, store = store.as_str(), error = %e, "Write failed");
        }
    }

    match watchers {
        Ok(names) if names.is_empty() => {
            info!(instrument = code, "No subscribers watch this instrument");
        }
        Ok(names) => {
            info!(instrument = code, subscribers = %names.join(", "), "Notifying subscribers");
        }
        Err(e) => {
            warn!(instrument = code, store = StoreKind::SubscriptionGraph.as_str(), error = %e, "Subscriber lookup failed");
        }
    }
}
