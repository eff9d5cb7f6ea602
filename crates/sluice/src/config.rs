//! Configuration for the sluice prime finder.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fan_out::WorkerCount;
use crate::primes::PrimeSearch;
pub use sluice_core::config::MetricsConfig;

/// Worker setting as written in YAML: `auto` or a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkersSetting {
    Auto(AutoKeyword),
    Count(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoKeyword {
    Auto,
}

impl Default for WorkersSetting {
    fn default() -> Self {
        WorkersSetting::Auto(AutoKeyword::Auto)
    }
}

impl From<WorkersSetting> for WorkerCount {
    fn from(setting: WorkersSetting) -> Self {
        match setting {
            WorkersSetting::Auto(_) => WorkerCount::Auto,
            WorkersSetting::Count(n) => WorkerCount::Fixed(n),
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Label for logs and metrics.
    #[serde(default = "default_name")]
    pub name: String,
    /// Buffer depth of every stream.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub workers: WorkersSetting,
    /// Number of primes to find.
    #[serde(default = "default_take")]
    pub take: usize,
    /// Exclusive upper bound of random candidates.
    #[serde(default = "default_max")]
    pub max: u64,
    /// Cancel the pipeline after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_name() -> String {
    "primes".to_string()
}

fn default_capacity() -> usize {
    4
}

fn default_take() -> usize {
    10
}

fn default_max() -> u64 {
    50_000_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            capacity: default_capacity(),
            workers: WorkersSetting::default(),
            take: default_take(),
            max: default_max(),
            timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn search(&self) -> PrimeSearch {
        PrimeSearch {
            max: self.max,
            workers: self.workers.into(),
            take: self.take,
        }
    }
}

/// Main configuration for sluice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = sluice_core::load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = sluice_core::parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.name",
                message: "must not be empty".to_string(),
            });
        }
        if pipeline.capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "pipeline.capacity",
            });
        }
        if pipeline.workers == WorkersSetting::Count(0) {
            return Err(ConfigError::ZeroValue {
                field: "pipeline.workers",
            });
        }
        if pipeline.take == 0 {
            return Err(ConfigError::ZeroValue {
                field: "pipeline.take",
            });
        }
        if pipeline.max == 0 {
            return Err(ConfigError::ZeroValue {
                field: "pipeline.max",
            });
        }
        if pipeline.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroValue {
                field: "pipeline.timeout_secs",
            });
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Default)]
#[command(version, about = "Find primes with a cancelable fan-out/fan-in pipeline")]
pub struct CliArgs {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of prime-testing workers (defaults to available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Number of primes to find
    #[arg(short = 'n', long)]
    pub take: Option<usize>,

    /// Exclusive upper bound of random candidates
    #[arg(long)]
    pub max: Option<u64>,

    /// Cancel the pipeline after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl CliArgs {
    /// Build the effective configuration: file (or defaults) overridden by flags.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => sluice_core::load_yaml(path)?,
            None => Config::default(),
        };

        let pipeline = &mut config.pipeline;
        if let Some(workers) = self.workers {
            pipeline.workers = WorkersSetting::Count(workers);
        }
        if let Some(take) = self.take {
            pipeline.take = take;
        }
        if let Some(max) = self.max {
            pipeline.max = max;
        }
        if self.timeout_secs.is_some() {
            pipeline.timeout_secs = self.timeout_secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.pipeline.workers, WorkersSetting::default());
        assert_eq!(config.metrics.address, None);
    }

    #[test]
    fn test_workers_auto_or_count() {
        let auto = Config::parse("pipeline:\n  workers: auto\n").unwrap();
        assert_eq!(WorkerCount::from(auto.pipeline.workers), WorkerCount::Auto);

        let fixed = Config::parse("pipeline:\n  workers: 3\n").unwrap();
        assert_eq!(WorkerCount::from(fixed.pipeline.workers), WorkerCount::Fixed(3));
    }

    #[test]
    fn test_workers_unknown_keyword_rejected() {
        let err = Config::parse("pipeline:\n  workers: many\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { .. }));
    }

    #[test]
    fn test_zero_values_rejected() {
        for (yaml, field) in [
            ("pipeline:\n  take: 0\n", "pipeline.take"),
            ("pipeline:\n  capacity: 0\n", "pipeline.capacity"),
            ("pipeline:\n  workers: 0\n", "pipeline.workers"),
            ("pipeline:\n  max: 0\n", "pipeline.max"),
        ] {
            match Config::parse(yaml) {
                Err(ConfigError::ZeroValue { field: got }) => assert_eq!(got, field),
                other => panic!("expected ZeroValue for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::parse("pipeline:\n  threads: 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { .. }));
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let args = CliArgs {
            workers: Some(2),
            take: Some(3),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let config = args.load_config().unwrap();

        assert_eq!(config.pipeline.workers, WorkersSetting::Count(2));
        assert_eq!(config.pipeline.take, 3);
        assert_eq!(config.pipeline.timeout_secs, Some(5));
        assert_eq!(config.pipeline.max, 50_000_000);
    }

    #[test]
    fn test_cli_override_is_validated() {
        let args = CliArgs {
            take: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            args.load_config(),
            Err(ConfigError::ZeroValue { field: "pipeline.take" })
        ));
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["sluice", "-w", "4", "-n", "7", "--timeout-secs", "2"]);
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.take, Some(7));
        assert_eq!(args.timeout_secs, Some(2));
        assert!(args.config.is_none());
    }
}
