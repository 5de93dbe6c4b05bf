//! The runtime owner.
//!
//! One [`Host`] owns the registry cache, the module loader, the shared state
//! channel and the tab composer. Everything a shell needs is reached through
//! it; tests build as many isolated hosts as they like.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tessera_core::{CapabilityBridge, CapabilityId, SYSTEM_CAPABILITY};
use tessera_events::SharedState;
use tracing::info;

use crate::loader::ModuleLoader;
use crate::mount::ModuleMount;
use crate::registry::{RegistryCache, RegistrySnapshot};
use crate::sandbox::{DEFAULT_EVALUATION_TIMEOUT, DEFAULT_MEMORY_LIMIT, Sandbox};
use crate::tabs::{CoreTab, TabComposer, TabStrip, default_core_tabs};

/// Knobs the host is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Capability that answers registry and module source requests.
    pub system_capability: CapabilityId,
    /// Heap limit of each module's sandbox.
    pub memory_limit_bytes: usize,
    /// Budget for evaluating each module's source.
    pub evaluation_timeout: Duration,
    /// The fixed startup tabs; also the registry fallback set.
    pub core_tabs: Vec<CoreTab>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            system_capability: SYSTEM_CAPABILITY,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT,
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
            core_tabs: default_core_tabs(),
        }
    }
}

impl From<&tessera_config::Config> for HostSettings {
    fn from(config: &tessera_config::Config) -> Self {
        Self {
            system_capability: CapabilityId::new(config.host.system_capability),
            memory_limit_bytes: config.sandbox.memory_limit_bytes,
            evaluation_timeout: Duration::from_millis(config.sandbox.evaluation_timeout_ms),
            core_tabs: config.core_tabs.iter().map(CoreTab::from).collect(),
        }
    }
}

/// Owner of the process-wide host services.
#[derive(Debug, Clone)]
pub struct Host {
    registry: RegistryCache,
    loader: ModuleLoader,
    state: SharedState,
    tabs: TabComposer,
    next_mount: Arc<AtomicU64>,
}

impl Host {
    /// Build a host over `bridge`. `None` means no execution boundary.
    #[must_use]
    pub fn new(bridge: Option<Arc<dyn CapabilityBridge>>, settings: HostSettings) -> Self {
        let fallback = settings
            .core_tabs
            .iter()
            .map(CoreTab::to_registry_entry)
            .collect();
        let registry = RegistryCache::new(bridge.clone(), settings.system_capability, fallback);
        let sandbox = Sandbox::new()
            .with_memory_limit(settings.memory_limit_bytes)
            .with_evaluation_timeout(settings.evaluation_timeout);
        let loader = ModuleLoader::new(
            bridge,
            settings.system_capability,
            sandbox,
            registry.clone(),
        );
        let tabs = TabComposer::new(settings.core_tabs, registry.clone(), loader.clone());

        info!(
            has_bridge = loader.bridge().is_some(),
            system_capability = %settings.system_capability,
            memory_limit = settings.memory_limit_bytes,
            "Host initialized"
        );

        Self {
            registry,
            loader,
            state: SharedState::new(),
            tabs,
            next_mount: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A host with no execution boundary and default settings.
    #[must_use]
    pub fn without_bridge() -> Self {
        Self::new(None, HostSettings::default())
    }

    /// The registry cache.
    #[must_use]
    pub fn registry(&self) -> &RegistryCache {
        &self.registry
    }

    /// The module loader.
    #[must_use]
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// The shared state channel.
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// The tab composer.
    #[must_use]
    pub fn tabs(&self) -> &TabComposer {
        &self.tabs
    }

    /// A new mount bound to this host, with its own container.
    #[must_use]
    pub fn mount_component(&self) -> ModuleMount {
        let n = self.next_mount.fetch_add(1, Ordering::Relaxed);
        ModuleMount::new(self.loader.clone(), self.state.clone(), format!("mount-{n}"))
    }

    /// A tab strip holding the core tabs.
    #[must_use]
    pub fn tab_strip(&self) -> TabStrip {
        TabStrip::new(self.tabs.core_tabs())
    }

    /// Forget the registry and every module, then fetch the registry again.
    ///
    /// Pass the snapshot to [`TabStrip::prune`] to drop tabs whose
    /// capability is gone.
    pub async fn reload(&self) -> Arc<RegistrySnapshot> {
        self.registry.invalidate().await;
        self.loader.clear(None);
        let snapshot = self.registry.fetch().await;
        info!(
            entries = snapshot.entries.len(),
            source = %snapshot.source,
            "Host reloaded"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config_match_builtins() {
        let config = tessera_config::Config::default();
        assert_eq!(HostSettings::from(&config), HostSettings::default());
    }

    #[tokio::test]
    async fn test_mount_components_get_distinct_containers() {
        let host = Host::without_bridge();
        let a = host.mount_component();
        let b = host.mount_component();
        assert_eq!(a.container().id(), "mount-0");
        assert_eq!(b.container().id(), "mount-1");
        assert_eq!(host.tab_strip().len(), 4);
    }
}
