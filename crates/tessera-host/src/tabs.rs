//! Tab/Descriptor Composer and the shell-side tab strip.

use serde::{Deserialize, Serialize};
use tessera_config::CoreTabConfig;
use tessera_core::{CapabilityId, RegistryEntry};
use tracing::debug;

use crate::loader::ModuleLoader;
use crate::registry::{RegistryCache, RegistrySnapshot};

/// Icon used when nothing more specific is known.
pub const DEFAULT_ICON: &str = "puzzle";

/// Category assigned to core tabs in the fallback registry.
pub const CORE_CATEGORY: &str = "core";

/// One entry of the fixed startup tab set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTab {
    /// Stable tab id.
    pub id: String,
    /// Capability rendered by the tab.
    pub capability: CapabilityId,
    /// Tab label.
    pub label: String,
    /// Tab icon.
    pub icon: String,
    /// Sort position.
    pub order: u32,
}

impl CoreTab {
    /// Create a core tab.
    pub fn new(
        id: impl Into<String>,
        capability: CapabilityId,
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

    /// The registry entry the fallback set carries for this tab.
    #[must_use]
    pub fn to_registry_entry(&self) -> RegistryEntry {
        RegistryEntry::new(self.capability, self.label.clone())
            .with_folder(self.id.clone())
            .with_category(CORE_CATEGORY)
            .with_ui(true)
            .with_tab(true)
    }

    /// The descriptor of this tab.
    #[must_use]
    pub fn descriptor(&self) -> TabDescriptor {
        TabDescriptor {
            id: self.id.clone(),
            capability: self.capability,
            label: self.label.clone(),
            icon: self.icon.clone(),
            is_core: true,
            closeable: false,
            order: Some(self.order),
        }
    }
}

impl From<&CoreTabConfig> for CoreTab {
    fn from(config: &CoreTabConfig) -> Self {
        Self::new(
            config.id.clone(),
            CapabilityId::new(config.capability),
            config.label.clone(),
            config.icon.clone(),
            config.order,
        )
    }
}

/// The built-in core tabs: workspace, tasks, library, settings.
#[must_use]
pub fn default_core_tabs() -> Vec<CoreTab> {
    vec![
        CoreTab::new("workspace", CapabilityId::new(1), "Workspace", "layout", 0),
        CoreTab::new("tasks", CapabilityId::new(2), "Tasks", "check-square", 1),
        CoreTab::new("library", CapabilityId::new(3), "Library", "book", 2),
        CoreTab::new("settings", CapabilityId::new(4), "Settings", "settings", 3),
    ]
}

/// A presentation-ready tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDescriptor {
    /// Tab id.
    pub id: String,
    /// Capability the tab mounts.
    #[serde(rename = "capabilityId")]
    pub capability: CapabilityId,
    /// Label.
    pub label: String,
    /// Icon name.
    pub icon: String,
    /// Whether the tab belongs to the fixed startup set.
    pub is_core: bool,
    /// Whether the user may close it.
    pub closeable: bool,
    /// Optional sort position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// Caller overrides for [`TabComposer::create_tab`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabOverrides {
    /// Label to use instead of the resolved one.
    pub label: Option<String>,
    /// Icon to use instead of the resolved one.
    pub icon: Option<String>,
    /// Sort position.
    pub order: Option<u32>,
}

impl TabOverrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Override the icon.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the sort position.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Icon for a registry category.
#[must_use]
pub fn category_icon(category: &str) -> &'static str {
    match category {
        "core" => "home",
        "analysis" => "chart",
        "media" => "image",
        _ => DEFAULT_ICON,
    }
}

/// Tab id of a non-core capability.
#[must_use]
pub fn discovered_tab_id(capability: CapabilityId) -> String {
    format!("capability-{capability}")
}

/// Builds tab descriptors from the core set, the registry and loaded modules.
#[derive(Debug, Clone)]
pub struct TabComposer {
    core: Vec<CoreTab>,
    registry: RegistryCache,
    loader: ModuleLoader,
}

impl TabComposer {
    /// Create a composer.
    #[must_use]
    pub fn new(core: Vec<CoreTab>, registry: RegistryCache, loader: ModuleLoader) -> Self {
        let mut core = core;
        core.sort_by_key(|tab| tab.order);
        Self {
            core,
            registry,
            loader,
        }
    }

    /// The fixed startup tabs, sorted by order. Never consults the registry.
    #[must_use]
    pub fn core_tabs(&self) -> Vec<TabDescriptor> {
        self.core.iter().map(CoreTab::descriptor).collect()
    }

    /// Whether `capability` backs a core tab.
    #[must_use]
    pub fn is_core(&self, capability: CapabilityId) -> bool {
        self.core_tab(capability).is_some()
    }

    fn core_tab(&self, capability: CapabilityId) -> Option<&CoreTab> {
        self.core.iter().find(|tab| tab.capability == capability)
    }

    /// Build the descriptor for `capability`, or `None` if it has no UI.
    ///
    /// Label: overrides, module `meta.title`, registry name, then the core
    /// label or `"Capability {id}"`. Icon: overrides, module `meta.icon`,
    /// registry category, then the core icon or the default. A blank
    /// registry name or category falls through. Module metadata is only
    /// read from already loaded modules; composing never loads.
    pub async fn create_tab(
        &self,
        capability: CapabilityId,
        overrides: Option<TabOverrides>,
    ) -> Option<TabDescriptor> {
        if !self.loader.has_ui(capability).await {
            debug!(capability = %capability, "No UI; no tab");
            return None;
        }

        let overrides = overrides.unwrap_or_default();
        let meta = self.loader.cached(capability).map(|m| m.meta().clone());
        let entry = self.registry.entry(capability).await;
        let core = self.core_tab(capability);

        let label = overrides
            .label
            .or_else(|| meta.as_ref().and_then(|m| m.title.clone()))
            .or_else(|| {
                entry
                    .as_ref()
                    .map(|e| e.name.clone())
                    .filter(|name| !name.trim().is_empty())
            })
            .or_else(|| core.map(|tab| tab.label.clone()))
            .unwrap_or_else(|| format!("Capability {capability}"));

        let icon = overrides
            .icon
            .or_else(|| meta.as_ref().and_then(|m| m.icon.clone()))
            .or_else(|| {
                entry
                    .as_ref()
                    .filter(|e| !e.category.trim().is_empty())
                    .map(|e| category_icon(&e.category).to_owned())
            })
            .or_else(|| core.map(|tab| tab.icon.clone()))
            .unwrap_or_else(|| DEFAULT_ICON.to_owned());

        let is_core = core.is_some();
        Some(TabDescriptor {
            id: core.map_or_else(|| discovered_tab_id(capability), |tab| tab.id.clone()),
            capability,
            label,
            icon,
            is_core,
            closeable: !is_core,
            order: overrides.order.or_else(|| core.map(|tab| tab.order)),
        })
    }

    /// Registry tabs outside the core set, sorted by capability.
    pub async fn discovered_tabs(&self) -> Vec<TabDescriptor> {
        let snapshot = self.registry.fetch().await;
        let mut ids: Vec<CapabilityId> = snapshot
            .tab_entries()
            .filter(|e| e.has_ui && !self.is_core(e.identifier))
            .map(|e| e.identifier)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut tabs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tab) = self.create_tab(id, None).await {
                tabs.push(tab);
            }
        }
        tabs
    }
}

/// The shell's list of open tabs.
///
/// Core tabs are always present and cannot be closed.
#[derive(Debug, Clone, Default)]
pub struct TabStrip {
    core: Vec<TabDescriptor>,
    opened: Vec<TabDescriptor>,
}

impl TabStrip {
    /// A strip holding `core`, sorted by order.
    #[must_use]
    pub fn new(core: Vec<TabDescriptor>) -> Self {
        let mut core = core;
        core.sort_by_key(|tab| tab.order.unwrap_or(u32::MAX));
        Self {
            core,
            opened: Vec::new(),
        }
    }

    /// Open `tab`, or return the already open tab with the same id.
    pub fn open(&mut self, tab: TabDescriptor) -> &TabDescriptor {
        if let Some(index) = self.core.iter().position(|open| open.id == tab.id) {
            return &self.core[index];
        }
        let index = match self.opened.iter().position(|open| open.id == tab.id) {
            Some(index) => index,
            None => {
                debug!(tab = %tab.id, capability = %tab.capability, "Tab opened");
                self.opened.push(tab);
                self.opened.len().saturating_sub(1)
            },
        };
        &self.opened[index]
    }

    /// Close a non-core tab. Returns it, or `None` for core or unknown ids.
    pub fn close(&mut self, tab_id: &str) -> Option<TabDescriptor> {
        let index = self.opened.iter().position(|tab| tab.id == tab_id)?;
        let tab = self.opened.remove(index);
        debug!(tab = %tab.id, "Tab closed");
        Some(tab)
    }

    /// Drop opened tabs whose capability no longer has a UI in `snapshot`.
    ///
    /// A fallback snapshot says nothing about the boundary's capabilities,
    /// so it prunes nothing.
    pub fn prune(&mut self, snapshot: &RegistrySnapshot) -> Vec<TabDescriptor> {
        if snapshot.is_fallback() {
            return Vec::new();
        }
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.opened)
            .into_iter()
            .partition(|tab| snapshot.has_ui(tab.capability));
        self.opened = kept;
        for tab in &removed {
            debug!(tab = %tab.id, capability = %tab.capability, "Tab pruned");
        }
        removed
    }

    /// Core tabs by order, then opened tabs in opening order.
    pub fn tabs(&self) -> impl Iterator<Item = &TabDescriptor> {
        self.core.iter().chain(&self.opened)
    }

    /// Look up an open tab.
    #[must_use]
    pub fn get(&self, tab_id: &str) -> Option<&TabDescriptor> {
        self.tabs().find(|tab| tab.id == tab_id)
    }

    /// Number of open tabs, core included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len().saturating_add(self.opened.len())
    }

    /// Whether the strip holds no tab at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.opened.is_empty()
    }

    /// Whether a tab with `tab_id` is open.
    #[must_use]
    pub fn contains(&self, tab_id: &str) -> bool {
        self.get(tab_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistrySource;

    fn discovered(id: u32) -> TabDescriptor {
        TabDescriptor {
            id: discovered_tab_id(CapabilityId::new(id)),
            capability: CapabilityId::new(id),
            label: format!("Capability {id}"),
            icon: DEFAULT_ICON.into(),
            is_core: false,
            closeable: true,
            order: None,
        }
    }

    fn core_strip() -> TabStrip {
        TabStrip::new(default_core_tabs().iter().map(CoreTab::descriptor).collect())
    }

    #[test]
    fn test_core_tab_descriptor_is_not_closeable() {
        for tab in default_core_tabs() {
            let descriptor = tab.descriptor();
            assert!(descriptor.is_core);
            assert!(!descriptor.closeable);
            let entry = tab.to_registry_entry();
            assert!(entry.has_ui && entry.is_tab);
            assert_eq!(entry.category, CORE_CATEGORY);
        }
    }

    #[test]
    fn test_descriptor_wire_names() {
        let json = serde_json::to_value(discovered(7)).unwrap();
        assert_eq!(json["capabilityId"], 7);
        assert_eq!(json["isCore"], false);
        assert_eq!(json["closeable"], true);
        assert!(json.get("order").is_none());
    }

    #[test]
    fn test_category_icons() {
        assert_eq!(category_icon("core"), "home");
        assert_eq!(category_icon("analysis"), "chart");
        assert_eq!(category_icon("media"), "image");
        assert_eq!(category_icon("anything"), DEFAULT_ICON);
    }

    #[test]
    fn test_strip_open_is_idempotent_and_core_is_fixed() {
        let mut strip = core_strip();
        assert_eq!(strip.len(), 4);

        strip.open(discovered(7));
        let again = strip.open(discovered(7)).clone();
        assert_eq!(again, discovered(7));
        assert_eq!(strip.len(), 5);

        assert!(strip.close("workspace").is_none());
        assert!(strip.contains("workspace"));
        assert_eq!(strip.close("capability-7"), Some(discovered(7)));
        assert_eq!(strip.len(), 4);
    }

    #[test]
    fn test_strip_order_is_core_then_opening_order() {
        let mut strip = core_strip();
        strip.open(discovered(9));
        strip.open(discovered(7));
        let ids: Vec<&str> = strip.tabs().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "workspace",
                "tasks",
                "library",
                "settings",
                "capability-9",
                "capability-7"
            ]
        );
    }

    #[test]
    fn test_prune_drops_vanished_capabilities() {
        let mut strip = core_strip();
        strip.open(discovered(7));
        strip.open(discovered(9));

        let fallback = RegistrySnapshot {
            entries: Vec::new(),
            source: RegistrySource::Fallback,
        };
        assert!(strip.prune(&fallback).is_empty());

        let snapshot = RegistrySnapshot {
            entries: vec![
                RegistryEntry::new(CapabilityId::new(7), "Charts")
                    .with_ui(true)
                    .with_tab(true),
            ],
            source: RegistrySource::Dedicated,
        };
        let removed = strip.prune(&snapshot);
        assert_eq!(removed, vec![discovered(9)]);
        assert!(strip.contains("capability-7"));
        assert!(strip.contains("workspace"));
    }
}
