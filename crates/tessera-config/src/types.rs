//! Configuration types for the Tessera host.
//!
//! Ids are plain integers here; conversion to domain types happens where
//! the host is assembled. Every struct implements [`Default`] so that a bare
//! `[section]` header produces a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host wiring.
    pub host: HostSection,
    /// Per-module sandbox limits.
    pub sandbox: SandboxSection,
    /// Execution boundary selection.
    pub bridge: BridgeSection,
    /// Logging.
    pub logging: LoggingSection,
    /// Always-present navigation entries. Replaced as a whole by any layer
    /// that sets it.
    #[serde(default = "default_core_tabs")]
    pub core_tabs: Vec<CoreTabConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HostSection::default(),
            sandbox: SandboxSection::default(),
            bridge: BridgeSection::default(),
            logging: LoggingSection::default(),
            core_tabs: default_core_tabs(),
        }
    }
}

// ---------------------------------------------------------------------------
// HostSection
// ---------------------------------------------------------------------------

/// Host wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Capability that answers the registry and module-source actions.
    pub system_capability: u32,
}

// ---------------------------------------------------------------------------
// SandboxSection
// ---------------------------------------------------------------------------

/// Smallest accepted sandbox memory limit (1 MiB).
pub const MIN_MEMORY_LIMIT_BYTES: usize = 1_048_576;

/// Default sandbox memory limit (16 MiB).
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 16_777_216;

/// Default wall-clock budget for evaluating one module's source.
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 5_000;

/// Per-module sandbox limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Heap limit applied to each module's Lua state.
    pub memory_limit_bytes: usize,
    /// Milliseconds a module's top-level chunk may run before it is aborted.
    pub evaluation_timeout_ms: u64,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            evaluation_timeout_ms: DEFAULT_EVALUATION_TIMEOUT_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeSection
// ---------------------------------------------------------------------------

/// Execution boundary selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    /// Directory served by the filesystem bridge. `None` runs the host
    /// without a boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"` .. `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate directives, e.g. `["tessera_host=debug"]`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CoreTabConfig
// ---------------------------------------------------------------------------

/// One always-present navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTabConfig {
    /// Stable tab id (`"workspace"`).
    pub id: String,
    /// Capability mounted when the tab is selected.
    pub capability: u32,
    /// Display label.
    pub label: String,
    /// Icon name.
    pub icon: String,
    /// Sort position among core tabs.
    #[serde(default)]
    pub order: u32,
}

impl CoreTabConfig {
    /// Create a core tab entry.
    pub fn new(
        id: impl Into<String>,
        capability: u32,
        label: impl Into<String>,
        icon: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            capability,
            label: label.into(),
            icon: icon.into(),
            order,
        }
    }
}

/// The built-in core tab set.
#[must_use]
pub fn default_core_tabs() -> Vec<CoreTabConfig> {
    vec![
        CoreTabConfig::new("workspace", 1, "Workspace", "layout", 0),
        CoreTabConfig::new("tasks", 2, "Tasks", "check-square", 1),
        CoreTabConfig::new("library", 3, "Library", "book", 2),
        CoreTabConfig::new("settings", 4, "Settings", "settings", 3),
    ]
}
