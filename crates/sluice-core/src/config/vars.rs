//! Environment variable expansion for config files.
//!
//! Recognised placeholders:
//! - `$VAR` and `${VAR}` expand to the variable's value; unset is an error
//! - `${VAR:-fallback}` expands to `fallback` when VAR is unset or empty
//! - `$$` is a literal `$`

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{ConfigError, EnvInterpolationSnafu};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$(?:
            (\$)                                       # 1: escaped dollar
          | \{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\} # 2: braced name, 3: fallback
          | ([A-Za-z_][A-Za-z0-9_]*)                   # 4: bare name
        )",
    )
    .expect("placeholder pattern is valid")
});

/// Expand placeholders using the process environment.
pub fn expand_env(input: &str) -> Result<String, ConfigError> {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand placeholders using `lookup` to resolve variable names.
///
/// Every unresolved variable is reported in a single error so a broken
/// config can be fixed in one pass.
pub fn expand_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut problems: Vec<String> = Vec::new();

    let expanded = PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            return "$".to_string();
        }

        let Some(name) = caps.get(2).or_else(|| caps.get(4)).map(|m| m.as_str()) else {
            return String::new();
        };
        let fallback = caps.get(3).map(|m| m.as_str());

        match (lookup(name), fallback) {
            (Some(value), _) if value.contains(['\n', '\r']) => {
                problems.push(format!("'{name}' contains a line break"));
                String::new()
            }
            (Some(value), Some(_)) if !value.is_empty() => value,
            (Some(value), None) => value,
            (_, Some(fallback)) => fallback.to_string(),
            (None, None) => {
                problems.push(format!("'{name}' is not set"));
                String::new()
            }
        }
    });

    if problems.is_empty() {
        Ok(expanded.into_owned())
    } else {
        EnvInterpolationSnafu {
            message: problems.join(", "),
        }
        .fail()
    }
}
