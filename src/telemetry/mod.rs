//! Logging setup and cache counters.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{ArpMetrics, Counter};
