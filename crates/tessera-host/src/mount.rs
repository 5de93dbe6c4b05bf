//! Host Mount Component.
//!
//! A [`ModuleMount`] owns one [`Container`] and drives it through
//! `Loading -> Ready | Error`. Each `mount` call stamps a new generation;
//! anything that settles under an older generation is discarded, and render
//! targets handed to modules stop writing the moment their generation is
//! superseded.
//!
//! Teardown order for an active module is always: cleanup closure, release
//! of its state subscriptions, then `on_deactivate`. Teardown consumes the
//! activation, so it runs at most once however many times `unmount` is
//! called.
//!
//! A module only becomes the active module after `on_activate` returns. An
//! `unmount` or new `mount` that lands while the hook is suspended is
//! noticed afterwards, and the mount that ran the hook tears the module down
//! itself, so `on_deactivate` never overtakes `on_activate`.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tessera_core::CapabilityId;
use tessera_events::SharedState;
use tracing::{debug, info, warn};

use crate::error::{MountError, MountResult};
use crate::loader::ModuleLoader;
use crate::module::{Activation, CloseCallback, RenderContext, SubscriptionSet, UiModule};
use crate::view::{Container, ViewNode};

/// Caller-supplied extras for one mount.
#[derive(Clone, Default)]
pub struct MountOptions {
    /// Exposed to the module as `props.initial_data`.
    pub initial_data: Option<Value>,
    /// Exposed to the module as `props.on_close()`.
    pub on_close: Option<CloseCallback>,
}

impl std::fmt::Debug for MountOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountOptions")
            .field("initial_data", &self.initial_data)
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

impl MountOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `props.initial_data`.
    #[must_use]
    pub fn with_initial_data(mut self, data: Value) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Set the callback behind `props.on_close()`.
    #[must_use]
    pub fn with_on_close(mut self, on_close: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(on_close));
        self
    }
}

/// Where a mount is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MountPhase {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Waiting for the module of this capability.
    Loading(CapabilityId),
    /// The module of this capability rendered.
    Ready(CapabilityId),
    /// The last request failed.
    Error {
        /// The capability that failed.
        capability: CapabilityId,
        /// Human readable reason.
        message: String,
    },
    /// Torn down for good.
    Unmounted,
}

impl MountPhase {
    /// The capability this phase refers to, if any.
    #[must_use]
    pub fn capability(&self) -> Option<CapabilityId> {
        match self {
            Self::Loading(id) | Self::Ready(id) | Self::Error { capability: id, .. } => Some(*id),
            Self::Idle | Self::Unmounted => None,
        }
    }
}

impl std::fmt::Display for MountPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading(id) => write!(f, "loading capability {id}"),
            Self::Ready(id) => write!(f, "capability {id} ready"),
            Self::Error {
                capability,
                message,
            } => write!(f, "capability {capability} failed: {message}"),
            Self::Unmounted => f.write_str("unmounted"),
        }
    }
}

/// How a `mount` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// The module rendered and is active.
    Ready,
    /// Loading or rendering failed; the mount shows the error.
    Failed(MountError),
    /// A later `mount` or `unmount` took over before this one settled.
    Superseded,
    /// The mount was already unmounted.
    Unmounted,
}

impl MountOutcome {
    /// Whether the module is now active.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The failure, if this outcome is one.
    ///
    /// # Errors
    ///
    /// Returns the [`MountError`] carried by [`MountOutcome::Failed`].
    pub fn into_result(self) -> MountResult<()> {
        match self {
            Self::Failed(e) => Err(e),
            Self::Ready | Self::Superseded | Self::Unmounted => Ok(()),
        }
    }
}

struct ActiveModule {
    module: Arc<UiModule>,
    activation: Activation,
}

impl ActiveModule {
    fn teardown(self) {
        let capability = self.module.capability();
        self.activation.finish();
        self.module.deactivate();
        debug!(capability = %capability, "Module torn down");
    }
}

#[derive(Default)]
struct MountSlot {
    phase: MountPhase,
    generation: u64,
    active: Option<ActiveModule>,
}

struct MountInner {
    loader: ModuleLoader,
    state: SharedState,
    container: Arc<Container>,
    slot: Mutex<MountSlot>,
}

impl MountInner {
    fn slot(&self) -> std::sync::MutexGuard<'_, MountSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.slot().generation == generation
    }
}

impl Drop for MountInner {
    fn drop(&mut self) {
        let active = self.slot().active.take();
        if let Some(active) = active {
            active.teardown();
        }
    }
}

/// Renders one capability's module into a host-owned container.
///
/// Cloning is cheap; clones drive the same container.
#[derive(Clone)]
pub struct ModuleMount {
    inner: Arc<MountInner>,
}

impl std::fmt::Debug for ModuleMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleMount")
            .field("container", &self.inner.container.id())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl ModuleMount {
    /// Create an idle mount with a fresh container named `container_id`.
    #[must_use]
    pub fn new(loader: ModuleLoader, state: SharedState, container_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MountInner {
                loader,
                state,
                container: Arc::new(Container::new(container_id)),
                slot: Mutex::new(MountSlot::default()),
            }),
        }
    }

    /// Load and render `capability`, replacing whatever was mounted.
    ///
    /// The previous module is torn down before the new one is requested.
    /// Never panics and never raises: failures land in
    /// [`MountPhase::Error`] and are reported as [`MountOutcome::Failed`].
    pub async fn mount(&self, capability: CapabilityId, options: MountOptions) -> MountOutcome {
        let inner = &self.inner;
        let (generation, previous) = {
            let mut slot = inner.slot();
            if slot.phase == MountPhase::Unmounted {
                return MountOutcome::Unmounted;
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.phase = MountPhase::Loading(capability);
            (slot.generation, slot.active.take())
        };
        inner.container.reset(generation);
        if let Some(previous) = previous {
            previous.teardown();
        }
        debug!(capability = %capability, generation, "Mount loading");

        let module = match inner.loader.try_load(capability).await {
            Ok(module) => module,
            Err(e) => return self.fail(generation, capability, MountError::Load(e)),
        };
        if !inner.is_current(generation) {
            debug!(capability = %capability, generation, "Discarding superseded load");
            return MountOutcome::Superseded;
        }

        let subscriptions = Arc::new(SubscriptionSet::new(inner.state.clone()));
        let ctx = RenderContext {
            target: inner.container.target(generation),
            bridge: inner.loader.bridge().cloned(),
            state: inner.state.clone(),
            subscriptions: Arc::clone(&subscriptions),
            on_close: options.on_close,
            initial_data: options.initial_data,
        };

        let activation = match module.render(ctx).await {
            Ok(activation) => activation,
            Err(e) => {
                subscriptions.release();
                return self.fail(generation, capability, e);
            },
        };

        if !inner.is_current(generation) {
            debug!(capability = %capability, generation, "Discarding superseded render");
            activation.finish();
            return MountOutcome::Superseded;
        }
        debug!(
            capability = %capability,
            cleanup = activation.has_cleanup(),
            subscriptions = activation.subscription_count(),
            "Module rendered"
        );

        if let Err(e) = module.activate().await {
            warn!(capability = %capability, error = %e, "on_activate failed");
        }
        let active = ActiveModule {
            module: Arc::clone(&module),
            activation,
        };

        {
            let mut slot = inner.slot();
            if slot.generation != generation {
                drop(slot);
                debug!(capability = %capability, generation, "Superseded during on_activate");
                active.teardown();
                return MountOutcome::Superseded;
            }
            slot.active = Some(active);
            slot.phase = MountPhase::Ready(capability);
        }
        info!(capability = %capability, container = inner.container.id(), "Module mounted");
        MountOutcome::Ready
    }

    /// [`mount`](Self::mount) with default options.
    pub async fn mount_id(&self, capability: CapabilityId) -> MountOutcome {
        self.mount(capability, MountOptions::default()).await
    }

    fn fail(&self, generation: u64, capability: CapabilityId, error: MountError) -> MountOutcome {
        let mut slot = self.inner.slot();
        if slot.generation != generation {
            return MountOutcome::Superseded;
        }
        warn!(capability = %capability, error = %error, "Mount failed");
        slot.phase = MountPhase::Error {
            capability,
            message: error.to_string(),
        };
        MountOutcome::Failed(error)
    }

    /// Tear down the active module and retire the mount.
    ///
    /// Returns `false` if it was already unmounted. Later `mount` calls
    /// return [`MountOutcome::Unmounted`].
    pub fn unmount(&self) -> bool {
        let (generation, active) = {
            let mut slot = self.inner.slot();
            if slot.phase == MountPhase::Unmounted {
                return false;
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.phase = MountPhase::Unmounted;
            (slot.generation, slot.active.take())
        };
        self.inner.container.reset(generation);
        if let Some(active) = active {
            active.teardown();
        }
        debug!(container = self.inner.container.id(), "Mount unmounted");
        true
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MountPhase {
        self.inner.slot().phase.clone()
    }

    /// The owned container.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.inner.container
    }

    /// The displayed tree, if any.
    #[must_use]
    pub fn view(&self) -> Option<ViewNode> {
        self.inner.container.root()
    }

    /// The active module.
    #[must_use]
    pub fn current_module(&self) -> Option<Arc<UiModule>> {
        self.inner
            .slot()
            .active
            .as_ref()
            .map(|active| Arc::clone(&active.module))
    }

    /// The capability of the current phase.
    #[must_use]
    pub fn capability(&self) -> Option<CapabilityId> {
        self.inner.slot().phase.capability()
    }

    /// Whether [`unmount`](Self::unmount) has run.
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.inner.slot().phase == MountPhase::Unmounted
    }
}
