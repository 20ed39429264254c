//! Prometheus Metrics Module
//!
//! Exposes ingestion metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Cycles**: Completed and cancelled passes, pass duration
//! - **Quotes**: Resolved quotes by origin, skipped instruments by reason
//! - **Stores**: Failed store calls by store and error kind
//! - **Prices**: Last resolved price per instrument

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use rust_decimal::prelude::ToPrimitive;

use crate::application::services::{CycleReport, InstrumentOutcome};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// A non-zero `port` also starts the scrape listener on `0.0.0.0:<port>`,
/// which must happen inside a tokio runtime. Calling this again returns the
/// already-installed handle.
///
/// # Errors
///
/// Returns an error if the recorder or listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = if port == 0 {
        PrometheusBuilder::new().install_recorder()?
    } else {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .build()?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(BuildError::FailedToSetGlobalRecorder)?;
        tokio::spawn(exporter);
        handle
    };

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "quote_fanout_cycles_total",
        "Total ingestion cycles by completion status"
    );
    describe_counter!(
        "quote_fanout_quotes_resolved_total",
        "Quotes resolved by origin (cache or source)"
    );
    describe_counter!(
        "quote_fanout_instruments_skipped_total",
        "Instruments skipped for lack of a quote, by reason"
    );
    describe_counter!(
        "quote_fanout_store_failures_total",
        "Failed store calls by store and error kind"
    );
    describe_gauge!(
        "quote_fanout_last_price",
        "Last resolved price by instrument"
    );
    describe_histogram!(
        "quote_fanout_cycle_duration_seconds",
        "Wall time of one pass over the instruments"
    );
}

/// Record everything a finished cycle reports.
pub fn record_cycle(report: &CycleReport) {
    let status = if report.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    counter!("quote_fanout_cycles_total", "status" => status).increment(1);
    histogram!("quote_fanout_cycle_duration_seconds").record(report.duration.as_secs_f64());

    for entry in &report.instruments {
        let instrument = entry.instrument_code.clone();
        match &entry.outcome {
            InstrumentOutcome::Skipped(reason) => {
                counter!(
                    "quote_fanout_instruments_skipped_total",
                    "instrument" => instrument,
                    "reason" => reason.kind()
                )
                .increment(1);
            }
            InstrumentOutcome::Ingested(fan_out) => {
                counter!(
                    "quote_fanout_quotes_resolved_total",
                    "instrument" => instrument.clone(),
                    "origin" => fan_out.origin.as_str()
                )
                .increment(1);
                if let Some(price) = fan_out.price.to_f64() {
                    gauge!("quote_fanout_last_price", "instrument" => instrument).set(price);
                }
                for failure in fan_out.failures() {
                    counter!(
                        "quote_fanout_store_failures_total",
                        "store" => failure.store().as_str(),
                        "kind" => failure.kind()
                    )
                    .increment(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{StoreError, StoreKind};
    use crate::application::services::{FanOutReport, InstrumentReport, ResolveError};
    use crate::domain::quote::PriceOrigin;
    use crate::domain::trend::Direction;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn report() -> CycleReport {
        CycleReport {
            instruments: vec![
                InstrumentReport {
                    instrument_code: "BTC".to_string(),
                    outcome: InstrumentOutcome::Ingested(Box::new(FanOutReport {
                        price: Decimal::new(5_000_000, 2),
                        origin: PriceOrigin::Source,
                        direction: Direction::Unknown,
                        cache_errors: vec![],
                        event_store: Ok(()),
                        time_series: Err(StoreError::unavailable(StoreKind::TimeSeries, "down")),
                        watchers: Ok(vec!["Ana".to_string()]),
                    })),
                },
                InstrumentReport {
                    instrument_code: "ETH".to_string(),
                    outcome: InstrumentOutcome::Skipped(ResolveError::SourceTimeout {
                        after: Duration::from_secs(5),
                    }),
                },
            ],
            cancelled: false,
            duration: Duration::from_millis(120),
        }
    }

    #[test]
    fn cycle_report_is_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || record_cycle(&report()));
        let rendered = handle.render();

        // Value of the first sample line matching a name and all labels
        let sample = |name: &str, labels: &[&str]| {
            rendered
                .lines()
                .find(|l| l.starts_with(name) && labels.iter().all(|label| l.contains(label)))
                .and_then(|l| l.rsplit(' ').next())
                .map(str::to_string)
        };

        assert_eq!(
            sample("quote_fanout_cycles_total", &[r#"status="completed""#]).as_deref(),
            Some("1")
        );
        assert_eq!(
            sample(
                "quote_fanout_quotes_resolved_total",
                &[r#"instrument="BTC""#, r#"origin="source""#]
            )
            .as_deref(),
            Some("1")
        );
        assert_eq!(
            sample(
                "quote_fanout_instruments_skipped_total",
                &[r#"instrument="ETH""#, r#"reason="source_timeout""#]
            )
            .as_deref(),
            Some("1")
        );
        assert_eq!(
            sample(
                "quote_fanout_store_failures_total",
                &[r#"store="time_series""#, r#"kind="unavailable""#]
            )
            .as_deref(),
            Some("1")
        );

        let price = sample("quote_fanout_last_price", &[r#"instrument="BTC""#]).unwrap();
        assert!((price.parse::<f64>().unwrap() - 50_000.0).abs() < f64::EPSILON);
    }
}
