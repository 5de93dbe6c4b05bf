//! Module Loader.
//!
//! Turns a capability id into a validated [`UiModule`]:
//! cache check, source retrieval over the boundary, sandboxed evaluation,
//! cache insertion. Every failure is absorbed into a [`LoadError`]; nothing
//! invalid is ever cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tessera_core::{CapabilityBridge, CapabilityId, source_from_response, ui_component_request};
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::module::UiModule;
use crate::registry::RegistryCache;
use crate::sandbox::Sandbox;

type LoadFuture = Shared<BoxFuture<'static, LoadResult<Arc<UiModule>>>>;

#[derive(Default)]
struct LoaderState {
    modules: HashMap<CapabilityId, Arc<UiModule>>,
    in_flight: HashMap<CapabilityId, (u64, LoadFuture)>,
    next_ticket: u64,
}

struct LoaderInner {
    bridge: Option<Arc<dyn CapabilityBridge>>,
    system_capability: CapabilityId,
    sandbox: Sandbox,
    registry: RegistryCache,
    state: Arc<Mutex<LoaderState>>,
}

/// Memoizing loader of capability UI modules.
///
/// Cloning is cheap; clones share one cache.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("has_bridge", &self.inner.bridge.is_some())
            .field("system_capability", &self.inner.system_capability)
            .field("sandbox", &self.inner.sandbox)
            .field("cached", &self.cached_count())
            .finish_non_exhaustive()
    }
}

impl ModuleLoader {
    /// Create a loader.
    ///
    /// `registry` answers [`has_ui`](Self::has_ui) for modules that are not
    /// cached yet.
    #[must_use]
    pub fn new(
        bridge: Option<Arc<dyn CapabilityBridge>>,
        system_capability: CapabilityId,
        sandbox: Sandbox,
        registry: RegistryCache,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                bridge,
                system_capability,
                sandbox,
                registry,
                state: Arc::new(Mutex::new(LoaderState::default())),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LoaderState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the module for `id`.
    ///
    /// A cached module is returned as is. Concurrent calls for the same
    /// uncached id share one retrieval and one evaluation.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] describing why no module could be produced.
    /// Failures are not cached, so a later call retries.
    pub async fn try_load(&self, id: CapabilityId) -> LoadResult<Arc<UiModule>> {
        let pending = {
            let mut state = self.state();
            if let Some(module) = state.modules.get(&id) {
                debug!(capability = %id, "Module cache hit");
                return Ok(Arc::clone(module));
            }
            if let Some((_, pending)) = state.in_flight.get(&id) {
                debug!(capability = %id, "Joining in-flight module load");
                pending.clone()
            } else {
                let ticket = state.next_ticket;
                state.next_ticket = state.next_ticket.wrapping_add(1);
                let pending = self.start(id, ticket);
                state.in_flight.insert(id, (ticket, pending.clone()));
                pending
            }
        };
        pending.await
    }

    /// [`try_load`](Self::try_load), reporting only presence.
    pub async fn load(&self, id: CapabilityId) -> Option<Arc<UiModule>> {
        self.try_load(id).await.ok()
    }

    /// Whether `id` has a UI.
    ///
    /// True for cached modules; otherwise the registry's `hasUI` flag. Never
    /// triggers a load.
    pub async fn has_ui(&self, id: CapabilityId) -> bool {
        if self.cached(id).is_some() {
            return true;
        }
        self.inner.registry.has_ui(id).await
    }

    /// The cached module for `id`, without loading.
    #[must_use]
    pub fn cached(&self, id: CapabilityId) -> Option<Arc<UiModule>> {
        self.state().modules.get(&id).cloned()
    }

    /// Number of cached modules.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.state().modules.len()
    }

    /// Whether a load for `id` is in progress.
    #[must_use]
    pub fn is_loading(&self, id: CapabilityId) -> bool {
        self.state().in_flight.contains_key(&id)
    }

    /// Forget `id`, or every module when `None`.
    ///
    /// Loads in flight for a cleared id still complete for their callers but
    /// are not inserted.
    pub fn clear(&self, id: Option<CapabilityId>) {
        let mut state = self.state();
        match id {
            Some(id) => {
                state.modules.remove(&id);
                state.in_flight.remove(&id);
                debug!(capability = %id, "Module cache entry cleared");
            },
            None => {
                state.modules.clear();
                state.in_flight.clear();
                debug!("Module cache cleared");
            },
        }
    }

    /// The boundary modules are retrieved from.
    #[must_use]
    pub fn bridge(&self) -> Option<&Arc<dyn CapabilityBridge>> {
        self.inner.bridge.as_ref()
    }

    fn start(&self, id: CapabilityId, ticket: u64) -> LoadFuture {
        let bridge = self.inner.bridge.clone();
        let system = self.inner.system_capability;
        let sandbox = self.inner.sandbox;
        let state = Arc::downgrade(&self.inner.state);

        async move {
            let result = fetch_and_evaluate(bridge, system, sandbox, id).await;
            settle(&state, id, ticket, &result);
            result
        }
        .boxed()
        .shared()
    }
}

async fn fetch_and_evaluate(
    bridge: Option<Arc<dyn CapabilityBridge>>,
    system: CapabilityId,
    sandbox: Sandbox,
    id: CapabilityId,
) -> LoadResult<Arc<UiModule>> {
    let bridge = bridge.ok_or(LoadError::BoundaryUnavailable)?;
    let response = bridge
        .invoke(system, ui_component_request(id))
        .await
        .map_err(|e| LoadError::Bridge(e.to_string()))?;
    let source = source_from_response(&response).ok_or(LoadError::EmptySource)?;
    sandbox.evaluate(id, &source).map(Arc::new)
}

fn settle(
    state: &Weak<Mutex<LoaderState>>,
    id: CapabilityId,
    ticket: u64,
    result: &LoadResult<Arc<UiModule>>,
) {
    match result {
        Ok(_) => info!(capability = %id, "Module loaded"),
        Err(e) => warn!(capability = %id, error = %e, "Module load failed"),
    }

    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    let current = state.in_flight.get(&id).is_some_and(|(t, _)| *t == ticket);
    if !current {
        debug!(capability = %id, "Load settled after clear; not caching");
        return;
    }
    state.in_flight.remove(&id);
    if let Ok(module) = result {
        state.modules.insert(id, Arc::clone(module));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test::{COUNTER_MODULE, MockBridge, NO_RENDER, SYNTAX_ERROR};

    fn loader(bridge: Option<Arc<MockBridge>>) -> ModuleLoader {
        let bridge = bridge.map(|b| b as Arc<dyn CapabilityBridge>);
        let registry = RegistryCache::new(bridge.clone(), CapabilityId::new(0), Vec::new());
        ModuleLoader::new(bridge, CapabilityId::new(0), Sandbox::new(), registry)
    }

    #[tokio::test]
    async fn test_no_bridge_is_boundary_unavailable() {
        let loader = loader(None);
        let err = loader.try_load(CapabilityId::new(7)).await.unwrap_err();
        assert_eq!(err, LoadError::BoundaryUnavailable);
        assert_eq!(loader.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_modes_are_distinguished_and_not_cached() {
        let bridge = Arc::new(
            MockBridge::new()
                .with_module(CapabilityId::new(2), NO_RENDER)
                .with_module(CapabilityId::new(3), SYNTAX_ERROR),
        );
        let loader = loader(Some(bridge.clone()));

        assert_eq!(
            loader.try_load(CapabilityId::new(1)).await.unwrap_err(),
            LoadError::EmptySource
        );
        assert_eq!(
            loader.try_load(CapabilityId::new(2)).await.unwrap_err(),
            LoadError::MissingRender
        );
        assert!(matches!(
            loader.try_load(CapabilityId::new(3)).await.unwrap_err(),
            LoadError::Evaluation(_)
        ));
        assert_eq!(loader.cached_count(), 0);

        loader.try_load(CapabilityId::new(2)).await.unwrap_err();
        assert_eq!(bridge.source_requests(CapabilityId::new(2)), 2);
    }

    #[tokio::test]
    async fn test_bridge_failure_is_reported() {
        let bridge = Arc::new(MockBridge::new().with_module(CapabilityId::new(7), COUNTER_MODULE));
        bridge.fail_sources(true);
        let loader = loader(Some(bridge));
        assert!(matches!(
            loader.try_load(CapabilityId::new(7)).await.unwrap_err(),
            LoadError::Bridge(_)
        ));
    }

    #[tokio::test]
    async fn test_clear_one_and_all() {
        let bridge = Arc::new(
            MockBridge::new()
                .with_module(CapabilityId::new(7), COUNTER_MODULE)
                .with_module(CapabilityId::new(8), COUNTER_MODULE),
        );
        let loader = loader(Some(bridge.clone()));
        loader.try_load(CapabilityId::new(7)).await.unwrap();
        loader.try_load(CapabilityId::new(8)).await.unwrap();
        assert_eq!(loader.cached_count(), 2);

        loader.clear(Some(CapabilityId::new(7)));
        assert!(loader.cached(CapabilityId::new(7)).is_none());
        assert!(loader.cached(CapabilityId::new(8)).is_some());

        loader.clear(None);
        assert_eq!(loader.cached_count(), 0);

        loader.try_load(CapabilityId::new(7)).await.unwrap();
        assert_eq!(bridge.source_requests(CapabilityId::new(7)), 2);
    }

    #[tokio::test]
    async fn test_clear_during_flight_does_not_insert() {
        let bridge = Arc::new(MockBridge::new().with_module(CapabilityId::new(7), COUNTER_MODULE));
        let gate = bridge.gate(CapabilityId::new(7));
        let loader = loader(Some(bridge));

        let (result, ()) = tokio::join!(loader.try_load(CapabilityId::new(7)), async {
            tokio::task::yield_now().await;
            assert!(loader.is_loading(CapabilityId::new(7)));
            loader.clear(None);
            gate.open();
        });

        assert!(result.is_ok());
        assert_eq!(loader.cached_count(), 0);
        assert!(!loader.is_loading(CapabilityId::new(7)));
    }
}
