//! sluice-core: shared infrastructure for the sluice crates.
//!
//! - `config/` - YAML loading with environment variable expansion
//! - `metrics/` - Prometheus metrics events and exporter setup
//! - `signal` - OS signal handling for graceful shutdown
//! - `tracing` - Subscriber initialization
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod tracing;

pub use crate::metrics::init as init_metrics;
pub use crate::tracing::init_tracing;
pub use config::{MetricsConfig, load_yaml, parse_yaml};
pub use error::{ConfigError, MetricsError};
pub use signal::shutdown_signal;
