//! Registry fallback, tab composition and reload pruning.

mod common;

use common::{COUNTER, HostHarness, NOTES, SUBSCRIBER, UNKNOWN};
use tessera_core::{CapabilityId, RegistryEntry};
use tessera_host::{Host, RegistrySource, TabOverrides, default_core_tabs};
use tessera_test::{MockBridge, charts_entry, sample_registry};

#[tokio::test]
async fn test_fallback_without_boundary() {
    let host = Host::without_bridge();

    let snapshot = host.registry().fetch().await;
    assert_eq!(snapshot.source, RegistrySource::Fallback);
    let expected: Vec<_> = default_core_tabs()
        .iter()
        .map(|tab| tab.to_registry_entry())
        .collect();
    assert_eq!(snapshot.entries, expected);

    let core = host.tabs().core_tabs();
    assert_eq!(core.len(), 4);
    assert!(core.iter().all(|tab| tab.is_core && !tab.closeable));
}

#[tokio::test]
async fn test_core_tabs_ignore_the_registry() {
    let harness = HostHarness::new();
    let ids: Vec<_> = harness
        .host
        .tabs()
        .core_tabs()
        .into_iter()
        .map(|tab| tab.id)
        .collect();
    assert_eq!(ids, ["workspace", "tasks", "library", "settings"]);
    assert_eq!(harness.bridge.dedicated_registry_calls(), 0);
}

#[tokio::test]
async fn test_failing_boundary_falls_back_then_recovers() {
    let harness = HostHarness::new();
    harness.bridge.fail_registry(true);

    let snapshot = harness.host.registry().fetch().await;
    assert!(snapshot.is_fallback());
    assert!(!harness.host.registry().is_memoized().await);

    harness.bridge.fail_registry(false);
    let snapshot = harness.host.registry().fetch().await;
    assert_eq!(snapshot.source, RegistrySource::Dedicated);
    assert_eq!(snapshot.entries, sample_registry());
}

#[tokio::test]
async fn test_create_tab_for_discovered_capability() {
    let harness = HostHarness::new();

    let tab = harness.host.tabs().create_tab(COUNTER, None).await.unwrap();

    assert_eq!(tab.id, "capability-7");
    assert_eq!(tab.capability, COUNTER);
    assert!(!tab.is_core);
    assert!(tab.closeable);
    assert_eq!(tab.label, charts_entry().name);
    assert_eq!(tab.icon, "chart");
    assert_eq!(tab.order, None);
    assert_eq!(harness.bridge.source_requests(COUNTER), 0);
}

#[tokio::test]
async fn test_create_tab_prefers_loaded_metadata_and_overrides() {
    let harness = HostHarness::new();
    harness.host.loader().load(COUNTER).await.unwrap();

    let tab = harness.host.tabs().create_tab(COUNTER, None).await.unwrap();
    assert_eq!(tab.label, "Counter");
    assert_eq!(tab.icon, "hash");

    let tab = harness
        .host
        .tabs()
        .create_tab(
            COUNTER,
            Some(TabOverrides::new().with_label("Mine").with_order(9)),
        )
        .await
        .unwrap();
    assert_eq!(tab.label, "Mine");
    assert_eq!(tab.icon, "hash");
    assert_eq!(tab.order, Some(9));
}

#[tokio::test]
async fn test_create_tab_for_core_capability() {
    let harness = HostHarness::new();

    let tab = harness
        .host
        .tabs()
        .create_tab(CapabilityId::new(1), None)
        .await
        .unwrap();

    assert_eq!(tab.id, "workspace");
    assert!(tab.is_core);
    assert!(!tab.closeable);
    assert_eq!(tab.label, "Workspace");
    assert_eq!(tab.icon, "home");
    assert_eq!(tab.order, Some(0));
}

#[tokio::test]
async fn test_registry_entry_outranks_core_label_and_icon() {
    let harness = HostHarness::with_bridge(MockBridge::new().with_registry(vec![
        RegistryEntry::new(CapabilityId::new(1), "Canvas")
            .with_category("analysis")
            .with_ui(true)
            .with_tab(true),
    ]));

    let tab = harness
        .host
        .tabs()
        .create_tab(CapabilityId::new(1), None)
        .await
        .unwrap();

    assert_eq!(tab.id, "workspace");
    assert!(tab.is_core);
    assert_eq!(tab.label, "Canvas");
    assert_eq!(tab.icon, "chart");
}

#[tokio::test]
async fn test_blank_registry_entry_falls_back_to_core_label_and_icon() {
    let harness = HostHarness::with_bridge(MockBridge::new().with_registry(vec![
        RegistryEntry::new(CapabilityId::new(1), " ")
            .with_ui(true)
            .with_tab(true),
    ]));

    let tab = harness
        .host
        .tabs()
        .create_tab(CapabilityId::new(1), None)
        .await
        .unwrap();

    assert_eq!(tab.label, "Workspace");
    assert_eq!(tab.icon, "layout");
}

#[tokio::test]
async fn test_create_tab_requires_ui() {
    let harness = HostHarness::new();
    let tabs = harness.host.tabs();

    assert!(tabs.create_tab(CapabilityId::new(12), None).await.is_none());
    assert!(tabs.create_tab(UNKNOWN, None).await.is_none());
    assert!(tabs.create_tab(NOTES, None).await.is_some());
}

#[tokio::test]
async fn test_discovered_tabs() {
    let harness = HostHarness::new();
    let ids: Vec<_> = harness
        .host
        .tabs()
        .discovered_tabs()
        .await
        .into_iter()
        .map(|tab| tab.capability)
        .collect();
    assert_eq!(ids, [COUNTER, SUBSCRIBER]);
}

#[tokio::test]
async fn test_reload_prunes_vanished_tabs_and_clears_modules() {
    let harness = HostHarness::new();
    let mut strip = harness.host.tab_strip();
    for tab in harness.host.tabs().discovered_tabs().await {
        strip.open(tab);
    }
    harness.host.loader().load(COUNTER).await.unwrap();
    assert_eq!(strip.len(), 6);

    let remaining = sample_registry()
        .into_iter()
        .filter(|entry| entry.identifier != SUBSCRIBER)
        .collect();
    harness.bridge.set_registry(Some(remaining));

    let snapshot = harness.host.reload().await;
    let removed = strip.prune(&snapshot);

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].capability, SUBSCRIBER);
    assert!(strip.contains("capability-7"));
    assert_eq!(harness.host.loader().cached_count(), 0);
    assert_eq!(harness.bridge.dedicated_registry_calls(), 2);
}

#[tokio::test]
async fn test_reload_onto_fallback_keeps_tabs() {
    let harness = HostHarness::new();
    let mut strip = harness.host.tab_strip();
    let tab = harness.host.tabs().create_tab(COUNTER, None).await.unwrap();
    strip.open(tab);

    harness.bridge.fail_registry(true);
    let snapshot = harness.host.reload().await;

    assert!(snapshot.is_fallback());
    assert!(strip.prune(&snapshot).is_empty());
    assert!(strip.contains("capability-7"));
}
