//! Filesystem-backed execution boundary.
//!
//! Layout of a module directory:
//!
//! ```text
//! <root>/
//! ├── registry.toml        # [[capability]] tables in RegistryEntry shape
//! └── modules/
//!     ├── charts.lua       # looked up by folderName ...
//!     └── 12.lua           # ... or by identifier
//! ```
//!
//! Only the system actions are meaningful here. Any other invocation echoes
//! its input back so that mounted modules can exercise `invoke_capability`
//! without a real backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::bridge::{ACTION_GET_REGISTRY, ACTION_GET_UI_COMPONENT, CapabilityBridge};
use crate::error::{BridgeError, BridgeResult};
use crate::{CapabilityId, RegistryEntry, RegistryResponse, SYSTEM_CAPABILITY};

/// Name of the registry file inside the root directory.
pub const REGISTRY_FILE: &str = "registry.toml";

/// Name of the module source directory inside the root directory.
pub const MODULES_DIR: &str = "modules";

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "capability")]
    capabilities: Vec<RegistryEntry>,
}

/// Execution boundary that serves a registry file and Lua module sources
/// from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryBridge {
    root: PathBuf,
    system_capability: CapabilityId,
}

impl DirectoryBridge {
    /// Serve from `root`, answering system actions on [`SYSTEM_CAPABILITY`].
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            system_capability: SYSTEM_CAPABILITY,
        }
    }

    /// Answer system actions on a different capability id.
    #[must_use]
    pub fn with_system_capability(mut self, capability: CapabilityId) -> Self {
        self.system_capability = capability;
        self
    }

    /// The directory being served.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_registry(&self) -> BridgeResult<Vec<RegistryEntry>> {
        let path = self.root.join(REGISTRY_FILE);
        let content = tokio::fs::read_to_string(&path).await?;
        let file: RegistryFile = toml::from_str(&content).map_err(|e| {
            BridgeError::InvalidResponse(format!("{}: {e}", path.display()))
        })?;
        Ok(file.capabilities)
    }

    async fn load_source(&self, capability: CapabilityId) -> BridgeResult<Option<String>> {
        let modules = self.root.join(MODULES_DIR);
        let mut candidates = Vec::with_capacity(2);
        if let Some(entry) = self
            .load_registry()
            .await?
            .into_iter()
            .find(|entry| entry.identifier == capability)
            && !entry.folder_name.is_empty()
        {
            candidates.push(modules.join(format!("{}.lua", entry.folder_name)));
        }
        candidates.push(modules.join(format!("{capability}.lua")));

        for path in candidates {
            match tokio::fs::read_to_string(&path).await {
                Ok(source) => {
                    debug!(
                        capability = %capability,
                        path = %path.display(),
                        "Serving module source"
                    );
                    return Ok(Some(source));
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    async fn system_action(&self, input: &Value) -> BridgeResult<Value> {
        let action = input.get("action").and_then(Value::as_str).unwrap_or("");
        match action {
            ACTION_GET_REGISTRY => {
                let registry = self.load_registry().await?;
                serde_json::to_value(RegistryResponse::ok(registry))
                    .map_err(|e| BridgeError::InvalidResponse(e.to_string()))
            },
            ACTION_GET_UI_COMPONENT => {
                let capability = input
                    .get("capabilityId")
                    .and_then(Value::as_u64)
                    .and_then(|raw| u32::try_from(raw).ok())
                    .map(CapabilityId::new)
                    .ok_or_else(|| {
                        BridgeError::InvalidResponse("missing or invalid capabilityId".into())
                    })?;
                Ok(match self.load_source(capability).await? {
                    Some(source) => json!({ "success": true, "source": source }),
                    None => json!({ "success": false, "error": "no ui module" }),
                })
            },
            other => Err(BridgeError::Invocation {
                capability: self.system_capability,
                message: format!("unknown action '{other}'"),
            }),
        }
    }
}

#[async_trait]
impl CapabilityBridge for DirectoryBridge {
    async fn invoke(&self, capability: CapabilityId, input: Value) -> BridgeResult<Value> {
        if capability == self.system_capability {
            return self.system_action(&input).await;
        }
        Ok(json!({
            "success": true,
            "capabilityId": capability.get(),
            "echo": input,
        }))
    }

    async fn fetch_registry(&self) -> BridgeResult<RegistryResponse> {
        self.load_registry().await.map(RegistryResponse::ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{registry_request, source_from_response, ui_component_request};

    const REGISTRY: &str = r#"
[[capability]]
id = 7
name = "Charts"
folderName = "charts"
category = "analysis"
hasUI = true
isTab = true

[[capability]]
id = 9
name = "Headless"
"#;

    fn fixture() -> (tempfile::TempDir, DirectoryBridge) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(REGISTRY_FILE), REGISTRY).unwrap();
        std::fs::create_dir(dir.path().join(MODULES_DIR)).unwrap();
        std::fs::write(
            dir.path().join(MODULES_DIR).join("charts.lua"),
            "return { render = function() end }",
        )
        .unwrap();
        let bridge = DirectoryBridge::new(dir.path());
        (dir, bridge)
    }

    #[tokio::test]
    async fn test_fetch_registry_reads_file() {
        let (_dir, bridge) = fixture();
        let response = bridge.fetch_registry().await.unwrap();
        assert!(response.success);
        assert_eq!(response.registry.len(), 2);
        assert_eq!(response.registry[0].name, "Charts");
        assert!(response.registry[0].has_ui);
        assert!(!response.registry[1].has_ui);
    }

    #[tokio::test]
    async fn test_generic_registry_action() {
        let (_dir, bridge) = fixture();
        let value = bridge
            .invoke(SYSTEM_CAPABILITY, registry_request())
            .await
            .unwrap();
        let response: RegistryResponse = serde_json::from_value(value).unwrap();
        assert!(response.success);
        assert_eq!(response.registry.len(), 2);
    }

    #[tokio::test]
    async fn test_source_by_folder_name() {
        let (_dir, bridge) = fixture();
        let value = bridge
            .invoke(SYSTEM_CAPABILITY, ui_component_request(CapabilityId::new(7)))
            .await
            .unwrap();
        assert!(source_from_response(&value).unwrap().contains("render"));
    }

    #[tokio::test]
    async fn test_source_by_identifier_fallback() {
        let (dir, bridge) = fixture();
        std::fs::write(dir.path().join(MODULES_DIR).join("9.lua"), "return {}").unwrap();
        let value = bridge
            .invoke(SYSTEM_CAPABILITY, ui_component_request(CapabilityId::new(9)))
            .await
            .unwrap();
        assert_eq!(source_from_response(&value).as_deref(), Some("return {}"));
    }

    #[tokio::test]
    async fn test_missing_source_reports_failure() {
        let (_dir, bridge) = fixture();
        let value = bridge
            .invoke(SYSTEM_CAPABILITY, ui_component_request(CapabilityId::new(99)))
            .await
            .unwrap();
        assert_eq!(value["success"], false);
        assert!(source_from_response(&value).is_none());
    }

    #[tokio::test]
    async fn test_unknown_system_action_fails() {
        let (_dir, bridge) = fixture();
        let result = bridge
            .invoke(SYSTEM_CAPABILITY, json!({"action": "Reboot"}))
            .await;
        assert!(matches!(result, Err(BridgeError::Invocation { .. })));
    }

    #[tokio::test]
    async fn test_other_capabilities_echo() {
        let (_dir, bridge) = fixture();
        let value = bridge
            .invoke(CapabilityId::new(7), json!({"q": 1}))
            .await
            .unwrap();
        assert_eq!(value["echo"]["q"], 1);
        assert_eq!(value["capabilityId"], 7);
    }

    #[tokio::test]
    async fn test_missing_registry_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = DirectoryBridge::new(dir.path());
        assert!(matches!(bridge.fetch_registry().await, Err(BridgeError::Io(_))));
    }
}
