//! Prometheus exporter setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::prelude::*;
use tracing::info;

use crate::error::{AddressParseSnafu, MetricsError, PrometheusInitSnafu};

/// Histogram buckets for duration metrics (in seconds).
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Parse a metrics listen address such as `"0.0.0.0:9090"`.
pub fn parse_address(address: &str) -> Result<SocketAddr, MetricsError> {
    address.parse().context(AddressParseSnafu { address })
}

/// Install the global Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn init(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .with_http_listener(addr)
        .install()
        .context(PrometheusInitSnafu)?;

    info!(%addr, "Metrics server started");
    Ok(())
}
