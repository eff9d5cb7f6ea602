//! Error types for sluice pipelines.
//!
//! Only setup faults and stage faults appear here. Per-item failures travel
//! through the pipeline as `Result` values, and cancellation is a normal exit
//! path rather than an error.

use snafu::prelude::*;

pub use sluice_core::error::{ConfigError, MetricsError};

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Channel depth of zero requested.
    #[snafu(display("Stream capacity must be at least 1"))]
    ZeroCapacity,

    /// Worker pool requested with no workers.
    #[snafu(display("Worker pool needs at least one worker"))]
    NoWorkers,

    /// Prime search requested over an empty range.
    #[snafu(display("Search range upper bound must be greater than zero"))]
    EmptySearchRange,

    /// A stage terminated abnormally.
    #[snafu(display("Stage '{stage}' faulted: {message}"))]
    StageFaulted { stage: String, message: String },

    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },
}

impl PipelineError {
    /// Check if this error was raised before any stage started.
    pub fn is_setup_error(&self) -> bool {
        !matches!(self, PipelineError::StageFaulted { .. })
    }
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<MetricsError> for PipelineError {
    fn from(source: MetricsError) -> Self {
        PipelineError::Metrics { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_faulted_display() {
        let err = PipelineError::StageFaulted {
            stage: "fan_out[1]".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Stage 'fan_out[1]' faulted: boom");
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_setup_errors() {
        assert!(PipelineError::NoWorkers.is_setup_error());
        assert!(PipelineError::ZeroCapacity.is_setup_error());
    }
}
