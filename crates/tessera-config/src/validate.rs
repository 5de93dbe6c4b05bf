//! Post-merge configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, MIN_MEMORY_LIMIT_BYTES};

const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_sandbox(config)?;
    validate_core_tabs(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_sandbox(config: &Config) -> ConfigResult<()> {
    let limit = config.sandbox.memory_limit_bytes;
    if limit < MIN_MEMORY_LIMIT_BYTES {
        return Err(invalid(
            "sandbox.memory_limit_bytes",
            format!("{limit} is below the minimum of {MIN_MEMORY_LIMIT_BYTES} bytes"),
        ));
    }
    if config.sandbox.evaluation_timeout_ms == 0 {
        return Err(invalid(
            "sandbox.evaluation_timeout_ms",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_core_tabs(config: &Config) -> ConfigResult<()> {
    if config.core_tabs.is_empty() {
        return Err(invalid(
            "core_tabs",
            "at least one core tab is required so the shell stays navigable",
        ));
    }

    let mut ids = HashSet::new();
    let mut capabilities = HashSet::new();
    for (index, tab) in config.core_tabs.iter().enumerate() {
        let field = format!("core_tabs[{index}]");
        if tab.id.trim().is_empty() {
            return Err(invalid(format!("{field}.id"), "must not be empty"));
        }
        if !ids.insert(tab.id.as_str()) {
            return Err(invalid(
                format!("{field}.id"),
                format!("duplicate core tab id '{}'", tab.id),
            ));
        }
        if !capabilities.insert(tab.capability) {
            return Err(invalid(
                format!("{field}.capability"),
                format!("capability {} is already a core tab", tab.capability),
            ));
        }
        if tab.capability == config.host.system_capability {
            return Err(invalid(
                format!("{field}.capability"),
                format!(
                    "capability {} is the system capability and cannot be mounted",
                    tab.capability
                ),
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}
