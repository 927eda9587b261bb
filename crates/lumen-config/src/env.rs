//! Environment variable overrides.
//!
//! `LUMEN_*` variables are the highest-precedence layer: they replace
//! whatever the embedded defaults or config files set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Integer,
    String,
}

/// All supported `LUMEN_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "LUMEN_MAX_ITERATIONS",
        field_path: "runtime.max_iterations",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "LUMEN_DETECTION_MODE",
        field_path: "runtime.detection_mode",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "LUMEN_DEFAULT_PROVIDER",
        field_path: "runtime.default_provider",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "LUMEN_CONFIRMATION_TIMEOUT_SECS",
        field_path: "approval.confirmation_timeout_secs",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "LUMEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::String,
    },
];

/// Snapshot the process environment, keeping only `LUMEN_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("LUMEN_"))
        .collect()
}

/// Apply environment overrides to the merged tree.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let value = match mapping.kind {
            FieldKind::Integer => {
                let n: i64 = raw.trim().parse().map_err(|_| ConfigError::EnvError {
                    var_name: mapping.var_name.to_owned(),
                    message: format!("expected an integer, got '{raw}'"),
                })?;
                toml::Value::Integer(n)
            },
            FieldKind::String => toml::Value::String(raw.trim().to_owned()),
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var override"
        );
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Set a dotted-path field, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> toml::Value {
        toml::from_str("[runtime]\nmax_iterations = 10\ndetection_mode = \"hybrid\"").unwrap()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut merged = base();
        let env = HashMap::from([
            ("LUMEN_MAX_ITERATIONS".to_owned(), "3".to_owned()),
            ("LUMEN_DETECTION_MODE".to_owned(), "text".to_owned()),
        ]);
        assert_eq!(apply_env_overrides(&mut merged, &env).unwrap(), 2);
        assert_eq!(merged["runtime"]["max_iterations"].as_integer(), Some(3));
        assert_eq!(merged["runtime"]["detection_mode"].as_str(), Some("text"));
    }

    #[test]
    fn test_creates_missing_sections() {
        let mut merged = base();
        let env = HashMap::from([("LUMEN_LOG_LEVEL".to_owned(), "debug".to_owned())]);
        apply_env_overrides(&mut merged, &env).unwrap();
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_bad_integer_is_an_error() {
        let mut merged = base();
        let env = HashMap::from([("LUMEN_MAX_ITERATIONS".to_owned(), "lots".to_owned())]);
        let err = apply_env_overrides(&mut merged, &env).unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { .. }));
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        let mut merged = base();
        let env = HashMap::from([("LUMEN_UNKNOWN".to_owned(), "x".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env).unwrap(), 0);
        assert_eq!(merged, base());
    }
}
