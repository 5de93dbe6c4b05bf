//! Loaded UI modules and their render contract.
//!
//! A [`UiModule`] is shared read-only by every mount of its capability.
//! Per-mount resources (the cleanup closure, shared state subscriptions) live
//! in an [`Activation`], owned by the mount that created it.
//!
//! A Lua state listener never runs inside `SharedState::set`. The writer may
//! be another module's Lua call holding that module's state lock, so each
//! listener gets a queue drained by its own task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use mlua::{AnyUserData, Function, Lua, LuaSerdeExt, Table, Value as LuaValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{CapabilityBridge, CapabilityId};
use tessera_events::{SharedState, StateMap, StateSnapshot, StateSubscriber, SubscriberId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{MountError, MountResult};
use crate::sandbox::JsonValue;
use crate::view::RenderTarget;

/// Callback a module can trigger through `props.on_close()`.
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Optional descriptive metadata exported as `meta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    /// Preferred tab label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Preferred tab icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Module version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

pub(crate) struct ModuleRuntime {
    pub(crate) lua: Lua,
    pub(crate) render: Function,
    pub(crate) on_activate: Option<Function>,
    pub(crate) on_deactivate: Option<Function>,
    pub(crate) ui: Table,
    pub(crate) dom: Table,
}

/// A validated, executable UI module.
pub struct UiModule {
    capability: CapabilityId,
    meta: ModuleMeta,
    has_activate: bool,
    has_deactivate: bool,
    runtime: Mutex<ModuleRuntime>,
}

impl std::fmt::Debug for UiModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiModule")
            .field("capability", &self.capability)
            .field("meta", &self.meta)
            .field("has_activate", &self.has_activate)
            .field("has_deactivate", &self.has_deactivate)
            .finish_non_exhaustive()
    }
}

/// Everything `render` needs besides the module itself.
pub(crate) struct RenderContext {
    pub(crate) target: RenderTarget,
    pub(crate) bridge: Option<Arc<dyn CapabilityBridge>>,
    pub(crate) state: SharedState,
    pub(crate) subscriptions: Arc<SubscriptionSet>,
    pub(crate) on_close: Option<CloseCallback>,
    pub(crate) initial_data: Option<Value>,
}

impl UiModule {
    pub(crate) fn new(capability: CapabilityId, meta: ModuleMeta, runtime: ModuleRuntime) -> Self {
        Self {
            capability,
            meta,
            has_activate: runtime.on_activate.is_some(),
            has_deactivate: runtime.on_deactivate.is_some(),
            runtime: Mutex::new(runtime),
        }
    }

    /// The capability this module belongs to.
    #[must_use]
    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    /// Exported metadata; empty when the module exports none.
    #[must_use]
    pub fn meta(&self) -> &ModuleMeta {
        &self.meta
    }

    /// Whether the module exports `on_activate`.
    #[must_use]
    pub fn has_activate_hook(&self) -> bool {
        self.has_activate
    }

    /// Whether the module exports `on_deactivate`.
    #[must_use]
    pub fn has_deactivate_hook(&self) -> bool {
        self.has_deactivate
    }

    fn runtime(&self) -> std::sync::MutexGuard<'_, ModuleRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call `render(container, props, ui, dom)`.
    ///
    /// Subscriptions the module makes are recorded in
    /// `ctx.subscriptions`, also when `render` fails.
    pub(crate) async fn render(&self, ctx: RenderContext) -> MountResult<Activation> {
        let subscriptions = Arc::clone(&ctx.subscriptions);
        let (render, args) = {
            let runtime = self.runtime();
            let args = build_render_args(&runtime, self.capability, ctx)
                .map_err(|e| MountError::Render(e.to_string()))?;
            (runtime.render.clone(), args)
        };

        let returned: LuaValue = render
            .call_async(args)
            .await
            .map_err(|e| MountError::Render(e.to_string()))?;

        let cleanup = match returned {
            LuaValue::Function(cleanup) => Some(cleanup),
            LuaValue::Nil => None,
            other => {
                debug!(
                    capability = %self.capability,
                    kind = other.type_name(),
                    "render returned a non-function; no cleanup retained"
                );
                None
            },
        };

        Ok(Activation {
            capability: self.capability,
            cleanup,
            subscriptions,
        })
    }

    /// Run `on_activate`, if exported.
    pub(crate) async fn activate(&self) -> MountResult<()> {
        let Some(hook) = self.runtime().on_activate.clone() else {
            return Ok(());
        };
        hook.call_async::<()>(())
            .await
            .map_err(|e| MountError::Render(format!("on_activate: {e}")))
    }

    /// Run `on_deactivate`, if exported. Failures are logged.
    pub(crate) fn deactivate(&self) {
        let Some(hook) = self.runtime().on_deactivate.clone() else {
            return;
        };
        if let Err(e) = hook.call::<()>(()) {
            warn!(capability = %self.capability, error = %e, "on_deactivate failed");
        }
    }
}

fn build_render_args(
    runtime: &ModuleRuntime,
    capability: CapabilityId,
    ctx: RenderContext,
) -> mlua::Result<(AnyUserData, Table, Table, Table)> {
    let lua = &runtime.lua;
    let container = lua.create_userdata(ctx.target)?;
    let props = build_props(
        lua,
        capability,
        &ctx.state,
        &ctx.subscriptions,
        ctx.bridge,
        ctx.on_close,
    )?;
    if let Some(data) = &ctx.initial_data {
        props.set("initial_data", lua.to_value(data)?)?;
    }
    Ok((container, props, runtime.ui.clone(), runtime.dom.clone()))
}

fn build_props(
    lua: &Lua,
    capability: CapabilityId,
    state: &SharedState,
    subscriptions: &Arc<SubscriptionSet>,
    bridge: Option<Arc<dyn CapabilityBridge>>,
    on_close: Option<CloseCallback>,
) -> mlua::Result<Table> {
    let props = lua.create_table()?;
    props.set("capability_id", capability.get())?;

    props.set(
        "invoke_capability",
        lua.create_async_function(move |_, (target, input): (u32, Option<JsonValue>)| {
            let bridge = bridge.clone();
            async move {
                let Some(bridge) = bridge else {
                    return Err(mlua::Error::runtime("no execution boundary is available"));
                };
                let input = input.map_or_else(|| Value::Object(serde_json::Map::new()), |v| v.0);
                bridge
                    .invoke(CapabilityId::new(target), input)
                    .await
                    .map(JsonValue)
                    .map_err(mlua::Error::external)
            }
        })?,
    )?;

    let reader = state.clone();
    props.set(
        "get_shared_state",
        lua.create_function(move |_, ()| Ok(JsonValue(Value::Object((*reader.get()).clone()))))?,
    )?;

    let writer = state.clone();
    props.set(
        "set_shared_state",
        lua.create_function(move |_, partial: JsonValue| {
            let partial = match partial.0 {
                // An empty Lua table carries no shape; treat it as an empty object.
                Value::Array(items) if items.is_empty() => Value::Object(serde_json::Map::new()),
                other => other,
            };
            writer.set_value(partial).map_err(mlua::Error::external)?;
            Ok(())
        })?,
    )?;

    let subs = Arc::clone(subscriptions);
    props.set(
        "subscribe_to_state",
        lua.create_function(move |lua, listener: Function| {
            let id = subs.subscribe(capability, listener)?;
            let subs = Arc::clone(&subs);
            lua.create_function(move |_, ()| Ok(subs.unsubscribe(id)))
        })?,
    )?;

    if let Some(on_close) = on_close {
        props.set(
            "on_close",
            lua.create_function(move |_, ()| {
                on_close();
                Ok(())
            })?,
        )?;
    }

    Ok(props)
}

/// Shared state subscriptions made by one activation.
pub(crate) struct SubscriptionSet {
    state: SharedState,
    live: Mutex<Vec<(SubscriberId, Arc<AtomicBool>)>>,
}

impl SubscriptionSet {
    pub(crate) fn new(state: SharedState) -> Self {
        Self {
            state,
            live: Mutex::new(Vec::new()),
        }
    }

    fn live(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriberId, Arc<AtomicBool>)>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(
        &self,
        capability: CapabilityId,
        listener: Function,
    ) -> mlua::Result<SubscriberId> {
        let runtime = Handle::try_current().map_err(|_| {
            mlua::Error::runtime("subscribe_to_state needs a running tokio runtime")
        })?;
        let (queue, pending) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        runtime.spawn(deliver(capability, listener, pending, Arc::clone(&active)));

        let id = self.state.subscribe(Arc::new(LuaSubscriber { capability, queue }));
        self.live().push((id, active));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut live = self.live();
        if let Some(index) = live.iter().position(|(existing, _)| *existing == id) {
            let (_, active) = live.swap_remove(index);
            active.store(false, Ordering::Release);
        }
        drop(live);
        self.state.unsubscribe(id)
    }

    /// Number of live subscriptions.
    pub(crate) fn len(&self) -> usize {
        self.live().len()
    }

    /// Drop every subscription. Returns how many were live.
    ///
    /// Snapshots still queued for these listeners are discarded.
    pub(crate) fn release(&self) -> usize {
        let live = std::mem::take(&mut *self.live());
        for (id, active) in &live {
            active.store(false, Ordering::Release);
            self.state.unsubscribe(*id);
        }
        live.len()
    }
}

/// Forwards snapshots to a listener's queue.
struct LuaSubscriber {
    capability: CapabilityId,
    queue: mpsc::UnboundedSender<StateSnapshot>,
}

impl StateSubscriber for LuaSubscriber {
    fn on_state(&self, snapshot: &StateSnapshot, _channel: &SharedState) {
        if self.queue.send(Arc::clone(snapshot)).is_err() {
            debug!(capability = %self.capability, "State listener already stopped");
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "lua-listener"
    }
}

/// Calls `listener` with each queued snapshot, in write order, until the
/// subscription ends.
async fn deliver(
    capability: CapabilityId,
    listener: Function,
    mut pending: mpsc::UnboundedReceiver<StateSnapshot>,
    active: Arc<AtomicBool>,
) {
    while let Some(snapshot) = pending.recv().await {
        if !active.load(Ordering::Acquire) {
            break;
        }
        let snapshot = JsonValue(Value::Object(StateMap::clone(&snapshot)));
        if let Err(e) = listener.call_async::<()>(snapshot).await {
            warn!(capability = %capability, error = %e, "State listener raised");
        }
    }
    debug!(capability = %capability, "State listener stopped");
}

/// Per-mount resources created by one successful `render`.
pub(crate) struct Activation {
    capability: CapabilityId,
    cleanup: Option<Function>,
    subscriptions: Arc<SubscriptionSet>,
}

impl Activation {
    /// Whether `render` returned a cleanup closure.
    pub(crate) fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Run the cleanup closure and drop the subscriptions.
    ///
    /// Consumes the activation, so the closure runs at most once.
    pub(crate) fn finish(self) {
        if let Some(cleanup) = self.cleanup
            && let Err(e) = cleanup.call::<()>(())
        {
            warn!(capability = %self.capability, error = %e, "Module cleanup raised");
        }
        let released = self.subscriptions.release();
        if released > 0 {
            debug!(capability = %self.capability, released, "Released state subscriptions");
        }
    }

    /// Number of live state subscriptions.
    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}
