//! sentinela - dual-tier endpoint health monitor
//!
//! Periodically checks a fixed inventory of named HTTP(S) endpoints and
//! publishes an inventory-ordered result set every cycle.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading, validation and inventory resolution
//! - [`models`] - Endpoints, probe outcomes and cycle snapshots
//! - [`probe`] - Fast (HTTP) and heavy (browser) probe tiers, failure taxonomy, routing
//! - [`scheduler`] - Bounded-concurrency cycles over both tiers
//! - [`output`] - Result sinks (HTML dashboard, JSON snapshot, metrics textfile)
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities, retry loop and browser errors
//!
//! # Example
//!
//! ```no_run
//! use sentinela::config::Config;
//! use sentinela::scheduler::CycleScheduler;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let mut scheduler = CycleScheduler::from_config(&config)?;
//!     let snapshot = scheduler.run_cycle().await;
//!     println!("{} up, {} down", snapshot.up_count(), snapshot.down_count());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod output;
pub mod probe;
pub mod scheduler;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{
        CycleSnapshot, DisplayTier, Endpoint, EndpointResult, HeavySettings, HttpStatus,
        ProbeOutcome, ProbePolicy, ProbeTier,
    };
    pub use crate::output::{ResultSink, SinkSet};
    pub use crate::probe::{ErrorKind, FastProbe, HeavyProber, HttpProber, RenderDriver};
    pub use crate::scheduler::CycleScheduler;
}

// Direct re-exports for convenience
pub use models::{CycleSnapshot, Endpoint, ProbeOutcome};
