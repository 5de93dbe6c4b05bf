//! Shared harness for host integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tessera_core::{CapabilityBridge, CapabilityId};
use tessera_host::{Host, HostSettings};
use tessera_test::{
    ACTIVATING_MODULE, CLOSING_MODULE, COUNTER_MODULE, EXPORTS_MODULE, INVOKE_MODULE, MockBridge,
    NO_RENDER, RENDER_ERROR, SUBSCRIBER_MODULE, THROWING, sample_registry,
};

pub const COUNTER: CapabilityId = CapabilityId::new(7);
pub const SUBSCRIBER: CapabilityId = CapabilityId::new(9);
pub const NOTES: CapabilityId = CapabilityId::new(15);
pub const BROKEN_RENDER: CapabilityId = CapabilityId::new(20);
pub const NO_RENDER_ID: CapabilityId = CapabilityId::new(21);
pub const INVOKER: CapabilityId = CapabilityId::new(22);
pub const CLOSER: CapabilityId = CapabilityId::new(23);
pub const THROWER: CapabilityId = CapabilityId::new(24);
pub const ACTIVATOR: CapabilityId = CapabilityId::new(25);
pub const PING_A: CapabilityId = CapabilityId::new(31);
pub const PING_B: CapabilityId = CapabilityId::new(32);
pub const UNKNOWN: CapabilityId = CapabilityId::new(99);

/// A host wired to a [`MockBridge`] serving the sample registry and one
/// module fixture per capability constant above.
pub struct HostHarness {
    pub host: Host,
    pub bridge: Arc<MockBridge>,
}

impl HostHarness {
    pub fn new() -> Self {
        Self::with_bridge(
            MockBridge::new()
                .with_registry(sample_registry())
                .with_module(COUNTER, COUNTER_MODULE)
                .with_module(SUBSCRIBER, SUBSCRIBER_MODULE)
                .with_module(NOTES, EXPORTS_MODULE)
                .with_module(BROKEN_RENDER, RENDER_ERROR)
                .with_module(NO_RENDER_ID, NO_RENDER)
                .with_module(INVOKER, INVOKE_MODULE)
                .with_module(CLOSER, CLOSING_MODULE)
                .with_module(THROWER, THROWING)
                .with_module(ACTIVATOR, ACTIVATING_MODULE),
        )
    }

    pub fn with_bridge(bridge: MockBridge) -> Self {
        tessera_test::setup_test_logging("warn");
        let bridge = Arc::new(bridge);
        let boundary: Arc<dyn CapabilityBridge> = bridge.clone();
        let host = Host::new(Some(boundary), HostSettings::default());
        Self { host, bridge }
    }

    /// Integer stored under `key` in the shared state, 0 when absent.
    pub fn counter(&self, key: &str) -> i64 {
        self.host
            .state()
            .get_key(key)
            .as_ref()
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }
}

/// Yield until `check` holds. Module state listeners run on their own task,
/// so deliveries land a few polls after the write.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
