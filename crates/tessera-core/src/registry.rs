//! Capability registry descriptors.
//!
//! The wire shape is camelCase (`folderName`, `hasUI`, `isTab`) because that
//! is what the execution boundary emits. `identifier` is also accepted as
//! `id` so that hand-written registry files stay short.

use serde::{Deserialize, Serialize};

use crate::CapabilityId;

/// Static descriptor for one capability.
///
/// Entries are produced wholesale by a registry fetch and never mutated in
/// place; a new fetch replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Unique identifier within a registry snapshot.
    #[serde(alias = "id")]
    pub identifier: CapabilityId,
    /// Human-readable display name.
    pub name: String,
    /// Directory/module name the capability's sources live under.
    #[serde(rename = "folderName", default)]
    pub folder_name: String,
    /// Free-form grouping (e.g. `core`, `analysis`).
    #[serde(default)]
    pub category: String,
    /// Whether the capability ships a UI module.
    #[serde(rename = "hasUI", default)]
    pub has_ui: bool,
    /// Whether the capability should appear as a primary tab.
    #[serde(rename = "isTab", default)]
    pub is_tab: bool,
    /// Longer description.
    #[serde(default)]
    pub description: String,
}

impl RegistryEntry {
    /// Create an entry with the given identifier and name and no UI.
    #[must_use]
    pub fn new(identifier: CapabilityId, name: impl Into<String>) -> Self {
        Self {
            identifier,
            name: name.into(),
            folder_name: String::new(),
            category: String::new(),
            has_ui: false,
            is_tab: false,
            description: String::new(),
        }
    }

    /// Set the folder name.
    #[must_use]
    pub fn with_folder(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = folder_name.into();
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Mark the entry as exposing a UI module.
    #[must_use]
    pub fn with_ui(mut self, has_ui: bool) -> Self {
        self.has_ui = has_ui;
        self
    }

    /// Mark the entry as a primary tab.
    #[must_use]
    pub fn with_tab(mut self, is_tab: bool) -> Self {
        self.is_tab = is_tab;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Response of a registry retrieval, from either the dedicated accessor or
/// the generic `GetPipelineRegistry` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResponse {
    /// Whether the boundary considers the lookup successful.
    #[serde(default)]
    pub success: bool,
    /// The capability descriptors.
    #[serde(default)]
    pub registry: Vec<RegistryEntry>,
    /// Failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistryResponse {
    /// A successful response carrying `registry`.
    #[must_use]
    pub fn ok(registry: Vec<RegistryEntry>) -> Self {
        Self {
            success: true,
            registry,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_wire_names() {
        let json = r#"{
            "identifier": 7,
            "name": "Charts",
            "folderName": "charts",
            "category": "analysis",
            "hasUI": true,
            "isTab": true,
            "description": "Plots things"
        }"#;
        let entry: RegistryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.identifier, CapabilityId::new(7));
        assert_eq!(entry.folder_name, "charts");
        assert!(entry.has_ui);
        assert!(entry.is_tab);
    }

    #[test]
    fn test_entry_accepts_id_alias_and_defaults() {
        let entry: RegistryEntry = serde_json::from_str(r#"{"id": 3, "name": "Bare"}"#).unwrap();
        assert_eq!(entry.identifier, CapabilityId::new(3));
        assert!(!entry.has_ui);
        assert!(!entry.is_tab);
        assert!(entry.category.is_empty());
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = RegistryEntry::new(CapabilityId::new(1), "One").with_ui(true);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["hasUI"], true);
        assert_eq!(json["isTab"], false);
        assert!(json.get("has_ui").is_none());
    }

    #[test]
    fn test_response_without_success_flag_is_failure() {
        let response: RegistryResponse = serde_json::from_str(r#"{"registry": []}"#).unwrap();
        assert!(!response.success);
    }
}
