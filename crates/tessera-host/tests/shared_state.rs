//! Shared state fan-out between the host and mounted modules.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{COUNTER, HostHarness, PING_A, PING_B, SUBSCRIBER};
use serde_json::{Value, json};
use tessera_events::{StateMap, StateSnapshot};
use tessera_host::MountOutcome;
use tessera_test::{MockBridge, PING_ROUNDS, PINGER_MODULE};

#[tokio::test]
async fn test_three_subscribers_each_see_one_merged_notification() {
    let harness = HostHarness::new();
    let state = harness.host.state();

    let mut seed = StateMap::new();
    seed.insert("theme".into(), json!("light"));
    state.set(seed);

    let seen: Arc<Mutex<Vec<(usize, StateSnapshot)>>> = Arc::default();
    for n in 0..3 {
        let seen = Arc::clone(&seen);
        state.subscribe_fn(format!("listener-{n}"), move |snapshot, _| {
            seen.lock().unwrap().push((n, Arc::clone(snapshot)));
        });
    }

    let mut partial = StateMap::new();
    partial.insert("selection".into(), json!([1, 2]));
    assert_eq!(state.set(partial), 3);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let mut listeners: Vec<usize> = seen.iter().map(|(n, _)| *n).collect();
    listeners.sort_unstable();
    assert_eq!(listeners, [0, 1, 2]);
    for (_, snapshot) in seen.iter() {
        assert_eq!(snapshot["theme"], "light");
        assert_eq!(snapshot["selection"], json!([1, 2]));
    }
}

#[tokio::test]
async fn test_module_writes_reach_other_modules() {
    let harness = HostHarness::new();
    let listener = harness.host.mount_component();
    let writer = harness.host.mount_component();

    listener.mount_id(SUBSCRIBER).await;
    let before = harness.host.state().get();

    writer.mount_id(COUNTER).await;

    assert_eq!(harness.counter("renders"), 1);
    assert!(!Arc::ptr_eq(&before, &harness.host.state().get()));
    common::eventually(|| {
        listener
            .view()
            .and_then(|view| view.attr("seen").and_then(serde_json::Value::as_i64))
            .is_some_and(|seen| seen >= 1)
    })
    .await;
}

#[tokio::test]
async fn test_host_writes_are_visible_to_modules() {
    let harness = HostHarness::new();
    let mut partial = StateMap::new();
    partial.insert("renders".into(), json!(41));
    harness.host.state().set(partial);

    harness.host.mount_component().mount_id(COUNTER).await;
    assert_eq!(harness.counter("renders"), 42);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_mounts_write_and_listen_across_threads() {
    let harness = HostHarness::with_bridge(
        MockBridge::new()
            .with_module(PING_A, PINGER_MODULE)
            .with_module(PING_B, PINGER_MODULE),
    );
    let mounts = [harness.host.mount_component(), harness.host.mount_component()];

    let tasks = [PING_A, PING_B].into_iter().zip(mounts.iter().cloned()).map(|(id, mount)| {
        tokio::spawn(async move { mount.mount_id(id).await })
    });
    let outcomes = tokio::time::timeout(Duration::from_secs(30), futures::future::join_all(tasks))
        .await
        .expect("concurrent mounts did not finish");

    for outcome in outcomes {
        assert_eq!(outcome.unwrap(), MountOutcome::Ready);
    }
    assert_eq!(harness.counter("ping-31"), PING_ROUNDS);
    assert_eq!(harness.counter("ping-32"), PING_ROUNDS);
    assert_eq!(harness.host.state().subscriber_count(), 2);

    let state = harness.host.state();
    common::eventually(|| {
        ["heard-31", "heard-32"]
            .iter()
            .all(|key| state.get_key(key).as_ref().and_then(Value::as_i64).is_some())
    })
    .await;
    assert!(harness.counter("heard-31") >= PING_ROUNDS);
    assert!(harness.counter("heard-32") >= PING_ROUNDS);
}

#[tokio::test]
async fn test_snapshot_queued_before_unmount_never_renders() {
    let harness = HostHarness::new();
    let state = harness.host.state();
    let mount = harness.host.mount_component();
    mount.mount_id(SUBSCRIBER).await;

    let mut partial = StateMap::new();
    partial.insert("theme".into(), json!("dark"));
    state.set(partial);
    mount.unmount();

    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    assert_eq!(state.subscriber_count(), 0);
    assert!(mount.view().is_none());
    assert_eq!(state.get_key("theme"), Some(json!("dark")));
}
