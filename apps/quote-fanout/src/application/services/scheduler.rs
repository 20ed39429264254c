//! Scheduler
//!
//! Drives the ingestion cycle on a fixed interval until cancelled. Owns the
//! backends and the last-price memory for the whole process lifetime.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Backends, CycleReport, IngestionCycle, LastPriceMemory};
use crate::domain::instrument::Instrument;

/// Fixed-interval driver for [`IngestionCycle`].
#[derive(Debug)]
pub struct Scheduler {
    backends: Backends,
    cycle: IngestionCycle,
    memory: LastPriceMemory,
    instruments: Vec<Instrument>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler with an empty price memory.
    #[must_use]
    pub fn new(
        backends: Backends,
        cycle: IngestionCycle,
        instruments: Vec<Instrument>,
        interval: Duration,
    ) -> Self {
        Self {
            backends,
            cycle,
            memory: LastPriceMemory::new(),
            instruments,
            interval,
        }
    }

    /// Last-seen prices.
    #[must_use]
    pub const fn memory(&self) -> &LastPriceMemory {
        &self.memory
    }

    /// Run a single cycle.
    pub async fn run_once(&self, cancel: &CancellationToken) -> CycleReport {
        self.cycle
            .run(&self.backends, &self.memory, &self.instruments, cancel)
            .await
    }

    /// Run cycles until `cancel` fires, calling `on_cycle` after each one.
    ///
    /// Returns the number of cycles that visited every instrument.
    pub async fn run<F>(&self, cancel: &CancellationToken, mut on_cycle: F) -> u64
    where
        F: FnMut(&CycleReport),
    {
        info!(
            instruments = self.instruments.len(),
            interval_secs = self.interval.as_secs_f64(),
            parallel = self.cycle.settings().parallel,
            "Scheduler started"
        );

        let mut completed = 0;
        while !cancel.is_cancelled() {
            let report = self.run_once(cancel).await;
            on_cycle(&report);
            if report.cancelled {
                break;
            }
            completed += 1;

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = cancel.cancelled() => break,
            }
        }

        info!(completed, "Scheduler stopped");
        completed
    }
}
