//! Registry fixtures.

use tessera_core::{CapabilityId, RegistryEntry};

/// Capability 7: an analysis tab with a UI, not part of the core set.
#[must_use]
pub fn charts_entry() -> RegistryEntry {
    RegistryEntry::new(CapabilityId::new(7), "Charts")
        .with_folder("charts")
        .with_category("analysis")
        .with_ui(true)
        .with_tab(true)
        .with_description("Plots pipeline output")
}

/// Capability 9: a media tab with a UI.
#[must_use]
pub fn gallery_entry() -> RegistryEntry {
    RegistryEntry::new(CapabilityId::new(9), "Gallery")
        .with_folder("gallery")
        .with_category("media")
        .with_ui(true)
        .with_tab(true)
}

/// Capability 12: backend only, no UI.
#[must_use]
pub fn ingest_entry() -> RegistryEntry {
    RegistryEntry::new(CapabilityId::new(12), "Ingest")
        .with_folder("ingest")
        .with_category("data")
}

/// Capability 15: has a UI but is not a primary tab.
#[must_use]
pub fn notes_entry() -> RegistryEntry {
    RegistryEntry::new(CapabilityId::new(15), "Notes")
        .with_folder("notes")
        .with_category("productivity")
        .with_ui(true)
}

/// Capability 1 as the boundary reports it.
#[must_use]
pub fn workspace_entry() -> RegistryEntry {
    RegistryEntry::new(CapabilityId::new(1), "Workspace")
        .with_folder("workspace")
        .with_category("core")
        .with_ui(true)
        .with_tab(true)
}

/// A small registry covering every flag combination.
#[must_use]
pub fn sample_registry() -> Vec<RegistryEntry> {
    vec![
        workspace_entry(),
        charts_entry(),
        gallery_entry(),
        ingest_entry(),
        notes_entry(),
    ]
}
