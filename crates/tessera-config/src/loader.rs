//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user file (`$TESSERA_HOME/config.toml`, else `~/.tessera/config.toml`)
//! 3. Merge `{workspace}/.tessera/config.toml`
//! 4. Merge the explicitly requested file, which must exist
//! 5. Apply `TESSERA_*` environment overrides
//! 6. Deserialize and validate

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{ENV_HOME, apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, deep_merge};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the per-user and per-workspace config directory.
pub const CONFIG_DIR: &str = ".tessera";

/// Name of the config file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Inputs of a layered load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Project root whose `.tessera/config.toml` is merged.
    pub workspace_root: Option<PathBuf>,
    /// A file that must exist and is merged after the workspace layer.
    pub explicit_file: Option<PathBuf>,
    /// Directory used instead of `~/.tessera` and `TESSERA_HOME`.
    pub home_override: Option<PathBuf>,
}

impl LoadOptions {
    /// Merge `{root}/.tessera/config.toml`.
    #[must_use]
    pub fn with_workspace(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Merge `path`, failing if it cannot be read.
    #[must_use]
    pub fn with_explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Look for the user file in `dir` instead of the home directory.
    #[must_use]
    pub fn with_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_override = Some(dir.into());
        self
    }
}

/// A validated configuration together with the layers it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layers that contributed, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

impl ResolvedConfig {
    /// Render the configuration as TOML, headed by the contributing layers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn show(&self) -> Result<String, std::fmt::Error> {
        let body = toml::to_string_pretty(&self.config).map_err(|_| std::fmt::Error)?;
        let mut output = String::from(
            "# Resolved Tessera configuration\n#\n# Layers (lowest precedence first):\n",
        );
        for (i, layer) in self.layers.iter().enumerate() {
            writeln!(output, "#   {}. {layer}", i.saturating_add(1))?;
        }
        output.push('\n');
        output.push_str(&body);
        Ok(output)
    }
}

/// Load the configuration with layered precedence.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable, oversized or
/// malformed, the explicit file is missing, or the merged result fails
/// validation.
pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    load_with_env(options, &collect_env_vars())
}

/// [`load`] against an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    options: &LoadOptions,
    env: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut layers = vec![ConfigLayer::Defaults];

    let user_path = user_config_path(options.home_override.as_deref(), env)?;
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
        layers.push(ConfigLayer::User(user_path));
    }

    if let Some(root) = &options.workspace_root {
        let path = root.join(CONFIG_DIR).join(CONFIG_FILE);
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded workspace config");
            layers.push(ConfigLayer::Workspace(path));
        }
    }

    if let Some(path) = &options.explicit_file {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded explicit config");
        layers.push(ConfigLayer::Explicit(path.clone()));
    }

    let overridden = apply_env_overrides(&mut merged, env);
    if overridden > 0 {
        debug!(count = overridden, "applied environment overrides");
        layers.push(ConfigLayer::Environment);
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig { config, layers })
}

/// Load and validate a single file without layering.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

fn user_config_path(
    home_override: Option<&Path>,
    env: &HashMap<String, String>,
) -> ConfigResult<PathBuf> {
    if let Some(dir) = home_override {
        return Ok(dir.join(CONFIG_FILE));
    }
    if let Some(dir) = env.get(ENV_HOME).filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir).join(CONFIG_FILE));
    }
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoHomeDir)
}

/// Read and parse a file, returning `None` if it does not exist.
///
/// A single read avoids a stat/read race; the size is checked afterwards.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}
