#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the Tessera module host.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tessera_config::Config;
//!
//! let resolved = Config::load(Some(std::path::Path::new("."))).unwrap();
//! println!("core tabs: {}", resolved.config.core_tabs.len());
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment** (`TESSERA_LOG_LEVEL`, `TESSERA_MODULES_DIR`)
//! 2. **Explicit file** (`--config PATH`)
//! 3. **Workspace** (`{workspace}/.tessera/config.toml`)
//! 4. **User** (`$TESSERA_HOME/config.toml` or `~/.tessera/config.toml`)
//! 5. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other tessera crate; conversion to domain types
//! happens where the host is assembled.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadOptions, ResolvedConfig};
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(workspace_root: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        let mut options = LoadOptions::default();
        options.workspace_root = workspace_root.map(std::path::Path::to_path_buf);
        loader::load(&options)
    }
}
