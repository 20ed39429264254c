//! Application Services
//!
//! - `PriceResolver`: cache-aside lookup with conditional fetch
//! - `IngestionCycle`: per-instrument resolve, trend, and fan-out
//! - `Scheduler`: runs the cycle on a fixed interval until cancelled
//! - `bootstrap`: fail-fast startup checks and provisioning

mod backends;
mod bootstrap;
mod deadline;
mod ingestion_cycle;
mod last_price_memory;
mod price_resolver;
mod scheduler;

pub use backends::Backends;
pub use bootstrap::{StartupError, bootstrap, startup_step};
pub use deadline::bounded;
pub use ingestion_cycle::{
    CycleReport, FanOutReport, IngestSettings, IngestionCycle, InstrumentOutcome,
    InstrumentReport,
};
pub use last_price_memory::LastPriceMemory;
pub use price_resolver::{PriceResolver, ResolveError, ResolvedQuote};
pub use scheduler::Scheduler;
