//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use tessera_core::{
    ACTION_GET_REGISTRY, ACTION_GET_UI_COMPONENT, BridgeError, BridgeResult, CapabilityBridge,
    CapabilityId, RegistryEntry, RegistryResponse, SYSTEM_CAPABILITY,
};

/// A one-shot latch that holds source retrievals until opened.
#[derive(Debug, Default)]
pub struct Gate {
    open: AtomicBool,
    notify: Notify,
}

impl Gate {
    /// Release every current and future waiter.
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether [`open`](Self::open) has been called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Wait until the gate is open.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    registry: Option<Vec<RegistryEntry>>,
    modules: HashMap<CapabilityId, String>,
    source_requests: HashMap<CapabilityId, usize>,
    invocations: Vec<(CapabilityId, Value)>,
    gates: HashMap<CapabilityId, Arc<Gate>>,
}

/// Scriptable execution boundary.
///
/// Serves a registry and per-capability module sources, counts every call,
/// and echoes invocations of non-system capabilities back as
/// `{ "success": true, "echo": input, "capabilityId": id }`.
///
/// Uses `std::sync::Mutex` internally so builders work without a runtime.
#[derive(Debug)]
pub struct MockBridge {
    system: CapabilityId,
    state: Mutex<MockState>,
    dedicated: AtomicBool,
    fail_registry: AtomicBool,
    fail_sources: AtomicBool,
    fail_invocations: AtomicBool,
    dedicated_calls: AtomicUsize,
    registry_invocations: AtomicUsize,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBridge {
    /// An empty boundary: no registry, no modules, dedicated accessor on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: SYSTEM_CAPABILITY,
            state: Mutex::new(MockState::default()),
            dedicated: AtomicBool::new(true),
            fail_registry: AtomicBool::new(false),
            fail_sources: AtomicBool::new(false),
            fail_invocations: AtomicBool::new(false),
            dedicated_calls: AtomicUsize::new(0),
            registry_invocations: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer system actions on `capability` instead of 0.
    #[must_use]
    pub fn with_system_capability(mut self, capability: CapabilityId) -> Self {
        self.system = capability;
        self
    }

    /// Serve `entries` as the registry.
    #[must_use]
    pub fn with_registry(self, entries: Vec<RegistryEntry>) -> Self {
        self.set_registry(Some(entries));
        self
    }

    /// Serve `source` as the UI module of `capability`.
    #[must_use]
    pub fn with_module(self, capability: CapabilityId, source: &str) -> Self {
        self.set_module(capability, Some(source));
        self
    }

    /// Report the dedicated registry accessor as unsupported.
    #[must_use]
    pub fn without_dedicated_registry(self) -> Self {
        self.dedicated.store(false, Ordering::SeqCst);
        self
    }

    /// Replace the registry; `None` makes registry lookups report failure.
    pub fn set_registry(&self, entries: Option<Vec<RegistryEntry>>) {
        self.state().registry = entries;
    }

    /// Replace or remove the module source of `capability`.
    pub fn set_module(&self, capability: CapabilityId, source: Option<&str>) {
        let mut state = self.state();
        match source {
            Some(source) => {
                state.modules.insert(capability, source.to_owned());
            },
            None => {
                state.modules.remove(&capability);
            },
        }
    }

    /// Make both registry paths fail.
    pub fn fail_registry(&self, fail: bool) {
        self.fail_registry.store(fail, Ordering::SeqCst);
    }

    /// Make source retrievals fail.
    pub fn fail_sources(&self, fail: bool) {
        self.fail_sources.store(fail, Ordering::SeqCst);
    }

    /// Make non-system invocations fail.
    pub fn fail_invocations(&self, fail: bool) {
        self.fail_invocations.store(fail, Ordering::SeqCst);
    }

    /// Hold source retrievals for, and invocations of, `capability` until
    /// the returned gate opens.
    #[must_use]
    pub fn gate(&self, capability: CapabilityId) -> Arc<Gate> {
        Arc::clone(self.state().gates.entry(capability).or_default())
    }

    /// Calls to the dedicated registry accessor.
    #[must_use]
    pub fn dedicated_registry_calls(&self) -> usize {
        self.dedicated_calls.load(Ordering::SeqCst)
    }

    /// `GetPipelineRegistry` invocations.
    #[must_use]
    pub fn registry_invocations(&self) -> usize {
        self.registry_invocations.load(Ordering::SeqCst)
    }

    /// `GetPipelineUIComponent` invocations for `capability`.
    #[must_use]
    pub fn source_requests(&self, capability: CapabilityId) -> usize {
        self.state()
            .source_requests
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }

    /// `GetPipelineUIComponent` invocations for any capability.
    #[must_use]
    pub fn total_source_requests(&self) -> usize {
        self.state().source_requests.values().sum()
    }

    /// Recorded invocations of non-system capabilities, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<(CapabilityId, Value)> {
        self.state().invocations.clone()
    }

    fn registry_failure(&self) -> BridgeError {
        BridgeError::Invocation {
            capability: self.system,
            message: "registry unavailable".into(),
        }
    }

    fn registry_result(&self) -> BridgeResult<Value> {
        self.registry_invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail_registry.load(Ordering::SeqCst) {
            return Err(self.registry_failure());
        }
        let response = match self.state().registry.clone() {
            Some(entries) => RegistryResponse::ok(entries),
            None => RegistryResponse {
                success: false,
                registry: Vec::new(),
                error: Some("no registry".into()),
            },
        };
        serde_json::to_value(response).map_err(|e| BridgeError::InvalidResponse(e.to_string()))
    }

    async fn source_result(&self, input: &Value) -> BridgeResult<Value> {
        let capability = input
            .get("capabilityId")
            .and_then(Value::as_u64)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(CapabilityId::new)
            .ok_or_else(|| BridgeError::InvalidResponse("missing capabilityId".into()))?;

        let gate = {
            let mut state = self.state();
            let count = state.source_requests.entry(capability).or_insert(0);
            *count = count.saturating_add(1);
            state.gates.get(&capability).cloned()
        };
        if let Some(gate) = gate {
            gate.wait().await;
        }

        if self.fail_sources.load(Ordering::SeqCst) {
            return Err(BridgeError::Invocation {
                capability: self.system,
                message: format!("source of {capability} unavailable"),
            });
        }
        Ok(match self.state().modules.get(&capability) {
            Some(source) => json!({ "success": true, "source": source }),
            None => json!({ "success": false, "error": "no UI component" }),
        })
    }
}

#[async_trait]
impl CapabilityBridge for MockBridge {
    async fn invoke(&self, capability: CapabilityId, input: Value) -> BridgeResult<Value> {
        if capability == self.system {
            return match input.get("action").and_then(Value::as_str) {
                Some(ACTION_GET_REGISTRY) => self.registry_result(),
                Some(ACTION_GET_UI_COMPONENT) => self.source_result(&input).await,
                other => Err(BridgeError::InvalidResponse(format!(
                    "unknown system action {other:?}"
                ))),
            };
        }

        let gate = {
            let mut state = self.state();
            state.invocations.push((capability, input.clone()));
            state.gates.get(&capability).cloned()
        };
        if let Some(gate) = gate {
            gate.wait().await;
        }
        if self.fail_invocations.load(Ordering::SeqCst) {
            return Err(BridgeError::Invocation {
                capability,
                message: "invocation failed".into(),
            });
        }
        Ok(json!({ "success": true, "echo": input, "capabilityId": capability }))
    }

    async fn fetch_registry(&self) -> BridgeResult<RegistryResponse> {
        if !self.dedicated.load(Ordering::SeqCst) {
            return Err(BridgeError::Unsupported("dedicated registry accessor".into()));
        }
        self.dedicated_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_registry.load(Ordering::SeqCst) {
            return Err(self.registry_failure());
        }
        Ok(match self.state().registry.clone() {
            Some(entries) => RegistryResponse::ok(entries),
            None => RegistryResponse {
                success: false,
                registry: Vec::new(),
                error: Some("no registry".into()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_registry;
    use tessera_core::{registry_request, source_from_response, ui_component_request};

    #[tokio::test]
    async fn test_serves_registry_both_ways() {
        let bridge = MockBridge::new().with_registry(sample_registry());
        let dedicated = bridge.fetch_registry().await.unwrap();
        assert!(dedicated.success);

        let generic = bridge
            .invoke(SYSTEM_CAPABILITY, registry_request())
            .await
            .unwrap();
        let generic: RegistryResponse = serde_json::from_value(generic).unwrap();
        assert_eq!(generic.registry, dedicated.registry);
        assert_eq!(bridge.dedicated_registry_calls(), 1);
        assert_eq!(bridge.registry_invocations(), 1);
    }

    #[tokio::test]
    async fn test_serves_sources_and_counts() {
        let bridge = MockBridge::new().with_module(CapabilityId::new(7), "return {}");
        let found = bridge
            .invoke(SYSTEM_CAPABILITY, ui_component_request(CapabilityId::new(7)))
            .await
            .unwrap();
        assert_eq!(source_from_response(&found).as_deref(), Some("return {}"));

        let missing = bridge
            .invoke(SYSTEM_CAPABILITY, ui_component_request(CapabilityId::new(8)))
            .await
            .unwrap();
        assert!(source_from_response(&missing).is_none());
        assert_eq!(bridge.total_source_requests(), 2);
    }

    #[tokio::test]
    async fn test_echoes_other_capabilities() {
        let bridge = MockBridge::new();
        let result = bridge
            .invoke(CapabilityId::new(42), json!({"q": 1}))
            .await
            .unwrap();
        assert_eq!(result["echo"]["q"], 1);
        assert_eq!(bridge.invocations().len(), 1);

        bridge.fail_invocations(true);
        assert!(bridge.invoke(CapabilityId::new(42), json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_gate_releases_waiters() {
        let gate = Gate::default();
        let ((), ()) = tokio::join!(gate.wait(), async {
            tokio::task::yield_now().await;
            gate.open();
        });
        assert!(gate.is_open());
        gate.wait().await;
    }

    #[tokio::test]
    async fn test_gate_holds_invocations() {
        let bridge = MockBridge::new();
        let gate = bridge.gate(CapabilityId::new(42));
        let (result, ()) = tokio::join!(bridge.invoke(CapabilityId::new(42), json!({})), async {
            tokio::task::yield_now().await;
            assert_eq!(bridge.invocations().len(), 1);
            gate.open();
        });
        assert!(result.is_ok());
    }
}
