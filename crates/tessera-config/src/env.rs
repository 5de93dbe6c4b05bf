//! Environment variable overrides.
//!
//! Unlike file layers, these are applied last and win over every file.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::set_path;

/// Points user config discovery at `$TESSERA_HOME/config.toml`.
pub const ENV_HOME: &str = "TESSERA_HOME";

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TESSERA_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "TESSERA_MODULES_DIR",
        field_path: "bridge.directory",
    },
];

/// Snapshot the `TESSERA_*` variables of this process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| name.starts_with("TESSERA_"))
        .collect()
}

/// Write every mapped, non-empty variable of `env` into `merged`.
///
/// Returns the number of fields overridden.
pub fn apply_env_overrides(merged: &mut toml::Value, env: &HashMap<String, String>) -> usize {
    let mut applied: usize = 0;
    for mapping in ENV_MAPPINGS {
        let Some(raw) = env.get(mapping.var_name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        debug!(var = mapping.var_name, field = mapping.field_path, "applying env override");
        set_path(merged, mapping.field_path, toml::Value::String(raw.to_owned()));
        applied = applied.saturating_add(1);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"\n").unwrap();
        let env = HashMap::from([
            ("TESSERA_LOG_LEVEL".to_owned(), "trace".to_owned()),
            ("TESSERA_MODULES_DIR".to_owned(), "/opt/modules".to_owned()),
            ("UNRELATED".to_owned(), "x".to_owned()),
        ]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 2);
        assert_eq!(merged["logging"]["level"].as_str(), Some("trace"));
        assert_eq!(merged["bridge"]["directory"].as_str(), Some("/opt/modules"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"\n").unwrap();
        let env = HashMap::from([("TESSERA_LOG_LEVEL".to_owned(), "  ".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("info"));
    }
}
