//! Configuration loading shared by sluice binaries.

mod vars;

pub use vars::{expand_env, expand_with};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu};

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener. Metrics stay disabled when unset.
    #[serde(default)]
    pub address: Option<String>,
}

/// Read a YAML file, expand environment placeholders, and deserialize it.
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parse_yaml(&contents)
}

/// Expand environment placeholders in `contents`, then deserialize it as YAML.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, ConfigError> {
    let expanded = expand_env(contents)?;
    serde_yaml::from_str(&expanded).context(YamlParseSnafu)
}
