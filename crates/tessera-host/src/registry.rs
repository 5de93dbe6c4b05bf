//! Registry Cache.
//!
//! Resolution order on a cache miss:
//!
//! 1. the boundary's dedicated registry accessor
//! 2. a generic `GetPipelineRegistry` invocation on the system capability
//! 3. the built-in fallback set (the core tabs as registry entries)
//!
//! Only boundary answers are memoized. A fallback snapshot is handed out but
//! never remembered, so the next fetch retries the boundary.

use std::sync::Arc;

use serde::Serialize;
use tessera_core::{
    BridgeError, CapabilityBridge, CapabilityId, RegistryEntry, RegistryResponse, registry_request,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where a registry snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrySource {
    /// The boundary's dedicated registry accessor.
    Dedicated,
    /// The generic `GetPipelineRegistry` invocation.
    Invoke,
    /// The built-in minimal set.
    Fallback,
}

impl std::fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dedicated => "dedicated",
            Self::Invoke => "invoke",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// An immutable view of the registry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    /// Capability descriptors, in boundary order.
    pub entries: Vec<RegistryEntry>,
    /// Where the entries came from.
    pub source: RegistrySource,
}

impl RegistrySnapshot {
    /// Entries flagged `isTab`.
    pub fn tab_entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(|e| e.is_tab)
    }

    /// Entries flagged `hasUI`.
    pub fn ui_entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(|e| e.has_ui)
    }

    /// Look up one entry.
    #[must_use]
    pub fn entry(&self, id: CapabilityId) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.identifier == id)
    }

    /// Whether `id` is registered with a UI.
    #[must_use]
    pub fn has_ui(&self, id: CapabilityId) -> bool {
        self.entry(id).is_some_and(|e| e.has_ui)
    }

    /// Display name for `id`, synthesized when the entry is absent or unnamed.
    #[must_use]
    pub fn display_name(&self, id: CapabilityId) -> String {
        match self.entry(id) {
            Some(entry) if !entry.name.trim().is_empty() => entry.name.clone(),
            _ => format!("Capability {id}"),
        }
    }

    /// Whether this is the built-in set rather than a boundary answer.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == RegistrySource::Fallback
    }
}

struct RegistryInner {
    bridge: Option<Arc<dyn CapabilityBridge>>,
    system_capability: CapabilityId,
    fallback: Vec<RegistryEntry>,
    memo: Mutex<Option<Arc<RegistrySnapshot>>>,
}

/// Memoized registry of capability descriptors.
///
/// Cloning is cheap; clones share one memo.
#[derive(Clone)]
pub struct RegistryCache {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for RegistryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCache")
            .field("has_bridge", &self.inner.bridge.is_some())
            .field("system_capability", &self.inner.system_capability)
            .field("fallback", &self.inner.fallback.len())
            .finish_non_exhaustive()
    }
}

impl RegistryCache {
    /// Create a cache over `bridge`, answering `fallback` when it cannot.
    #[must_use]
    pub fn new(
        bridge: Option<Arc<dyn CapabilityBridge>>,
        system_capability: CapabilityId,
        fallback: Vec<RegistryEntry>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                bridge,
                system_capability,
                fallback,
                memo: Mutex::new(None),
            }),
        }
    }

    /// The current snapshot, resolving it on a miss.
    ///
    /// Concurrent callers are serialized on the memo, so a miss resolves
    /// against the boundary once.
    pub async fn fetch(&self) -> Arc<RegistrySnapshot> {
        let mut memo = self.inner.memo.lock().await;
        if let Some(snapshot) = memo.as_ref() {
            debug!(entries = snapshot.entries.len(), "Registry cache hit");
            return Arc::clone(snapshot);
        }

        match self.resolve().await {
            Some(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *memo = Some(Arc::clone(&snapshot));
                snapshot
            },
            None => Arc::new(self.fallback_snapshot()),
        }
    }

    /// Drop the memo; the next fetch re-resolves from the boundary.
    pub async fn invalidate(&self) {
        if self.inner.memo.lock().await.take().is_some() {
            debug!("Registry cache invalidated");
        }
    }

    /// Re-resolve now.
    ///
    /// On success the memo is replaced. On failure the previous memo stays
    /// in place and is returned; with no previous memo the fallback set is.
    pub async fn refresh(&self) -> Arc<RegistrySnapshot> {
        let mut memo = self.inner.memo.lock().await;
        match self.resolve().await {
            Some(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *memo = Some(Arc::clone(&snapshot));
                snapshot
            },
            None => match memo.as_ref() {
                Some(previous) => {
                    warn!("Registry refresh failed; keeping previous snapshot");
                    Arc::clone(previous)
                },
                None => Arc::new(self.fallback_snapshot()),
            },
        }
    }

    /// Whether a boundary answer is currently memoized.
    pub async fn is_memoized(&self) -> bool {
        self.inner.memo.lock().await.is_some()
    }

    /// Entries flagged `isTab`.
    pub async fn tab_entries(&self) -> Vec<RegistryEntry> {
        self.fetch().await.tab_entries().cloned().collect()
    }

    /// Entries flagged `hasUI`.
    pub async fn ui_entries(&self) -> Vec<RegistryEntry> {
        self.fetch().await.ui_entries().cloned().collect()
    }

    /// Look up one entry.
    pub async fn entry(&self, id: CapabilityId) -> Option<RegistryEntry> {
        self.fetch().await.entry(id).cloned()
    }

    /// Whether `id` is registered with a UI.
    pub async fn has_ui(&self, id: CapabilityId) -> bool {
        self.fetch().await.has_ui(id)
    }

    /// Display name for `id`.
    pub async fn display_name(&self, id: CapabilityId) -> String {
        self.fetch().await.display_name(id)
    }

    /// The built-in entries.
    #[must_use]
    pub fn fallback_entries(&self) -> &[RegistryEntry] {
        &self.inner.fallback
    }

    fn fallback_snapshot(&self) -> RegistrySnapshot {
        info!(
            entries = self.inner.fallback.len(),
            "Using built-in registry fallback"
        );
        RegistrySnapshot {
            entries: self.inner.fallback.clone(),
            source: RegistrySource::Fallback,
        }
    }

    async fn resolve(&self) -> Option<RegistrySnapshot> {
        let Some(bridge) = self.inner.bridge.as_ref() else {
            debug!("No execution boundary; registry unavailable");
            return None;
        };

        match bridge.fetch_registry().await {
            Ok(response) if response.success => {
                debug!(entries = response.registry.len(), "Registry from dedicated accessor");
                return Some(RegistrySnapshot {
                    entries: response.registry,
                    source: RegistrySource::Dedicated,
                });
            },
            Ok(response) => {
                warn!(
                    error = response.error.as_deref().unwrap_or("unspecified"),
                    "Dedicated registry accessor reported failure"
                );
            },
            Err(BridgeError::Unsupported(_)) => {
                debug!("No dedicated registry accessor; using generic invocation");
            },
            Err(e) => {
                warn!(error = %e, "Dedicated registry accessor failed");
            },
        }

        let result = match bridge
            .invoke(self.inner.system_capability, registry_request())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Generic registry invocation failed");
                return None;
            },
        };

        match serde_json::from_value::<RegistryResponse>(result) {
            Ok(response) if response.success => {
                debug!(entries = response.registry.len(), "Registry from generic invocation");
                Some(RegistrySnapshot {
                    entries: response.registry,
                    source: RegistrySource::Invoke,
                })
            },
            Ok(response) => {
                warn!(
                    error = response.error.as_deref().unwrap_or("unspecified"),
                    "Generic registry invocation reported failure"
                );
                None
            },
            Err(e) => {
                warn!(error = %e, "Generic registry invocation returned an unreadable result");
                None
            },
        }
    }
}
