//! Common error types shared by the sluice crates.
//!
//! Configuration and metrics setup both fail before any pipeline stage is
//! spawned, so these errors are always reported synchronously to the caller.

use std::path::PathBuf;

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed: {message}"))]
    EnvInterpolation { message: String },

    /// A numeric setting that must be positive was zero.
    #[snafu(display("'{field}' must be greater than zero"))]
    ZeroValue { field: &'static str },

    /// A setting had a value outside its accepted set.
    #[snafu(display("Invalid value for '{field}': {message}"))]
    InvalidValue { field: &'static str, message: String },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to parse the metrics listen address.
    #[snafu(display("Failed to parse metrics address '{address}': {source}"))]
    AddressParse {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder: {source}"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_value_display() {
        let err = ZeroValueSnafu { field: "take" }.build();
        assert_eq!(err.to_string(), "'take' must be greater than zero");
    }

    #[test]
    fn test_address_parse_display_names_address() {
        let source = "nope".parse::<std::net::SocketAddr>().unwrap_err();
        let err = MetricsError::AddressParse {
            address: "nope".to_string(),
            source,
        };
        assert!(err.to_string().contains("'nope'"));
    }
}
