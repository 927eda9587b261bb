//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `runtime.max_iterations` and persona caps.
pub const MAX_ITERATIONS_UPPER_BOUND: u32 = 100;

/// Smallest salt that still resists forging a closing delimiter.
pub const MIN_SALT_BYTES: usize = 8;

const MAX_SALT_BYTES: usize = 64;

const DETECTION_MODES: &[&str] = &["native", "text", "hybrid"];
const RISK_LEVELS: &[&str] = &["low", "high-input", "high-output"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "full", "json"];

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_runtime(config)?;
    validate_approval(config)?;
    validate_spotlight(config)?;
    validate_logging(config)?;
    validate_personas(config)?;
    Ok(())
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    let r = &config.runtime;

    if !(1..=MAX_ITERATIONS_UPPER_BOUND).contains(&r.max_iterations) {
        return Err(invalid(
            "runtime.max_iterations",
            format!(
                "{} is out of range; must be between 1 and {MAX_ITERATIONS_UPPER_BOUND}",
                r.max_iterations
            ),
        ));
    }

    if !DETECTION_MODES.contains(&r.detection_mode.as_str()) {
        return Err(invalid(
            "runtime.detection_mode",
            format!(
                "unsupported mode '{}'; expected one of: native, text, hybrid",
                r.detection_mode
            ),
        ));
    }

    if r.max_output_tokens == 0 {
        return Err(invalid("runtime.max_output_tokens", "must be greater than 0"));
    }
    if r.max_tool_output_chars == 0 {
        return Err(invalid(
            "runtime.max_tool_output_chars",
            "must be greater than 0",
        ));
    }
    if r.default_provider.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(invalid("runtime.default_provider", "must not be empty"));
    }
    Ok(())
}

fn normalize_risk(level: &str) -> String {
    level.trim().to_ascii_lowercase().replace('_', "-")
}

fn validate_approval(config: &Config) -> ConfigResult<()> {
    let a = &config.approval;

    if a.confirmation_timeout_secs == 0 {
        return Err(invalid(
            "approval.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }

    if !RISK_LEVELS.contains(&normalize_risk(&a.unknown_tool_risk).as_str()) {
        return Err(invalid(
            "approval.unknown_tool_risk",
            format!(
                "unknown risk level '{}'; expected one of: low, high-input, high-output",
                a.unknown_tool_risk
            ),
        ));
    }

    for (tool, level) in &a.risk_overrides {
        if !RISK_LEVELS.contains(&normalize_risk(level).as_str()) {
            return Err(invalid(
                format!("approval.risk_overrides.{tool}"),
                format!("unknown risk level '{level}'"),
            ));
        }
    }
    Ok(())
}

fn validate_spotlight(config: &Config) -> ConfigResult<()> {
    let bytes = config.spotlight.salt_bytes;
    if !(MIN_SALT_BYTES..=MAX_SALT_BYTES).contains(&bytes) {
        return Err(invalid(
            "spotlight.salt_bytes",
            format!("{bytes} is out of range; must be between {MIN_SALT_BYTES} and {MAX_SALT_BYTES}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, full, json",
                l.format
            ),
        ));
    }
    Ok(())
}

fn validate_personas(config: &Config) -> ConfigResult<()> {
    for (name, persona) in &config.personas {
        if persona.system_prompt.trim().is_empty() {
            return Err(invalid(
                format!("personas.{name}.system_prompt"),
                "must not be empty",
            ));
        }
        if let Some(max) = persona.max_iterations
            && !(1..=MAX_ITERATIONS_UPPER_BOUND).contains(&max)
        {
            return Err(invalid(
                format!("personas.{name}.max_iterations"),
                format!("{max} is out of range; must be between 1 and {MAX_ITERATIONS_UPPER_BOUND}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PersonaSection;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_max_iterations_bounds() {
        let mut config = Config::default();
        config.runtime.max_iterations = 0;
        assert_eq!(field_of(validate(&config).unwrap_err()), "runtime.max_iterations");

        config.runtime.max_iterations = 101;
        assert!(validate(&config).is_err());

        config.runtime.max_iterations = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_detection_mode() {
        let mut config = Config::default();
        config.runtime.detection_mode = "psychic".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "runtime.detection_mode");
    }

    #[test]
    fn test_risk_levels() {
        let mut config = Config::default();
        config.approval.unknown_tool_risk = "high_output".to_owned();
        assert!(validate(&config).is_ok());

        config
            .approval
            .risk_overrides
            .insert("my_tool".to_owned(), "scary".to_owned());
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "approval.risk_overrides.my_tool"
        );
    }

    #[test]
    fn test_salt_minimum() {
        let mut config = Config::default();
        config.spotlight.salt_bytes = 4;
        assert_eq!(field_of(validate(&config).unwrap_err()), "spotlight.salt_bytes");
    }

    #[test]
    fn test_persona_validation() {
        let mut config = Config::default();
        config.personas.insert(
            "terse".to_owned(),
            PersonaSection {
                system_prompt: "Be brief.".to_owned(),
                max_iterations: Some(500),
            },
        );
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "personas.terse.max_iterations"
        );
    }

    #[test]
    fn test_logging_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }
}
