//! Sandboxed evaluation of module source text.
//!
//! Every module gets its own Lua 5.4 state with a reduced standard library
//! (base, table, string, math, utf8), no file or code loading, a heap limit,
//! and only these globals from the host:
//!
//! - `module` / `exports` - the export surface the source populates
//! - `host.log(level, message)` and `host.capability_id`
//! - `print(...)`, forwarded to `tracing` at debug level
//!
//! The chunk either returns its export table or fills in `module.exports`.
//! Evaluation of the chunk is bounded by a wall-clock deadline, checked every
//! [`INSTRUCTION_CHECK_INTERVAL`] VM instructions.

use std::time::{Duration, Instant};

use mlua::{
    ChunkMode, DeserializeOptions, FromLua, Function, HookTriggers, IntoLua, Lua, LuaOptions,
    LuaSerdeExt, StdLib, Table, Value as LuaValue, VmState,
};
use serde_json::Value;
use tessera_core::CapabilityId;
use tracing::{debug, error, info, trace, warn};

use crate::error::{LoadError, LoadResult};
use crate::module::{ModuleMeta, ModuleRuntime, UiModule};

/// Default heap limit for one module (16 MiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 16_777_216;

/// Default budget for running a module's top-level chunk.
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(5);

/// VM instructions between two deadline checks.
pub const INSTRUCTION_CHECK_INTERVAL: u32 = 10_000;

/// Globals removed from every module state before its source runs.
const REMOVED_GLOBALS: [&str; 6] = [
    "dofile",
    "loadfile",
    "load",
    "loadstring",
    "require",
    "collectgarbage",
];

/// Installs `print` on top of `host.log`.
const GLOBALS_PRELUDE: &str = r##"
local log, select, tostring, concat = host.log, select, tostring, table.concat
print = function(...)
  local parts = {}
  for i = 1, select("#", ...) do
    parts[#parts + 1] = tostring((select(i, ...)))
  end
  log("debug", concat(parts, "\t"))
end
"##;

/// Builds the `ui` and `dom` handles passed to `render`.
const RENDER_PRELUDE: &str = r#"
local ui, dom = {}, {}

function ui.element(tag, attrs, children)
  if type(tag) ~= "string" then
    error("ui.element: tag must be a string", 2)
  end
  if children == nil and type(attrs) ~= "table" and attrs ~= nil then
    children, attrs = attrs, nil
  end
  if children ~= nil and type(children) ~= "table" then
    children = { children }
  end
  return { tag = tag, attrs = attrs or {}, children = children or {} }
end

function ui.text(value)
  return tostring(value)
end

function ui.fragment(children)
  return { tag = "fragment", attrs = {}, children = children or {} }
end

function dom.render(node, container)
  return container:mount(node)
end

function dom.unmount(container)
  return container:clear()
end

return ui, dom
"#;

/// Lua-side JSON value.
///
/// Tables holding functions or userdata convert with those members dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct JsonValue(pub(crate) Value);

impl IntoLua for JsonValue {
    fn into_lua(self, lua: &Lua) -> mlua::Result<LuaValue> {
        lua.to_value(&self.0)
    }
}

impl FromLua for JsonValue {
    fn from_lua(value: LuaValue, lua: &Lua) -> mlua::Result<Self> {
        let options = DeserializeOptions::new().deny_unsupported_types(false);
        lua.from_value_with(value, options).map(Self)
    }
}

/// Factory for isolated module states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sandbox {
    memory_limit: usize,
    evaluation_timeout: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
        }
    }
}

impl Sandbox {
    /// A sandbox with the default heap limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-module heap limit in bytes.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// The per-module heap limit in bytes.
    #[must_use]
    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// Set how long a module's top-level chunk may run.
    #[must_use]
    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    /// How long a module's top-level chunk may run.
    #[must_use]
    pub fn evaluation_timeout(&self) -> Duration {
        self.evaluation_timeout
    }

    /// Evaluate `source` as the UI module of `capability`.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Sandbox`] if the Lua state cannot be prepared
    /// - [`LoadError::Evaluation`] if the chunk fails to compile, raises, or
    ///   outruns the evaluation timeout
    /// - [`LoadError::MissingRender`] if no callable `render` is exported
    pub fn evaluate(&self, capability: CapabilityId, source: &str) -> LoadResult<UiModule> {
        let lua = self.new_state(capability).map_err(|e| LoadError::Sandbox(e.to_string()))?;
        let (ui, dom): (Table, Table) = lua
            .load(RENDER_PRELUDE)
            .set_name("=tessera-render")
            .eval()
            .map_err(|e| LoadError::Sandbox(e.to_string()))?;

        self.arm_deadline(&lua);
        let returned = lua
            .load(source)
            .set_name(format!("=capability-{capability}"))
            .set_mode(ChunkMode::Text)
            .eval::<LuaValue>();
        lua.remove_hook();
        let returned = returned.map_err(|e| LoadError::Evaluation(e.to_string()))?;

        let exports = resolve_exports(&lua, returned)?;
        let render = match exports.get::<LuaValue>("render") {
            Ok(LuaValue::Function(render)) => render,
            _ => return Err(LoadError::MissingRender),
        };
        let on_activate = optional_hook(&exports, "on_activate", capability);
        let on_deactivate = optional_hook(&exports, "on_deactivate", capability);
        let meta = read_meta(&lua, &exports, capability);

        debug!(
            capability = %capability,
            title = meta.title.as_deref().unwrap_or(""),
            has_on_activate = on_activate.is_some(),
            has_on_deactivate = on_deactivate.is_some(),
            "Module evaluated"
        );

        Ok(UiModule::new(
            capability,
            meta,
            ModuleRuntime {
                lua,
                render,
                on_activate,
                on_deactivate,
                ui,
                dom,
            },
        ))
    }

    fn arm_deadline(&self, lua: &Lua) {
        let timeout = self.evaluation_timeout;
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return;
        };
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(INSTRUCTION_CHECK_INTERVAL),
            move |_, _| {
                if Instant::now() >= deadline {
                    return Err(mlua::Error::runtime(format!(
                        "evaluation exceeded {} ms",
                        timeout.as_millis()
                    )));
                }
                Ok(VmState::Continue)
            },
        );
    }

    fn new_state(&self, capability: CapabilityId) -> mlua::Result<Lua> {
        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
            LuaOptions::default(),
        )?;
        lua.set_memory_limit(self.memory_limit)?;

        let globals = lua.globals();
        for name in REMOVED_GLOBALS {
            globals.set(name, LuaValue::Nil)?;
        }

        let host = lua.create_table()?;
        host.set("capability_id", capability.get())?;
        host.set(
            "log",
            lua.create_function(move |_, (level, message): (String, String)| {
                match level.to_ascii_lowercase().as_str() {
                    "trace" => trace!(capability = %capability, "[lua] {message}"),
                    "debug" => debug!(capability = %capability, "[lua] {message}"),
                    "warn" => warn!(capability = %capability, "[lua] {message}"),
                    "error" => error!(capability = %capability, "[lua] {message}"),
                    _ => info!(capability = %capability, "[lua] {message}"),
                }
                Ok(())
            })?,
        )?;
        globals.set("host", host)?;

        let module = lua.create_table()?;
        let exports = lua.create_table()?;
        module.set("exports", exports.clone())?;
        globals.set("module", module)?;
        globals.set("exports", exports)?;

        lua.load(GLOBALS_PRELUDE).set_name("=tessera-globals").exec()?;
        Ok(lua)
    }
}

fn resolve_exports(lua: &Lua, returned: LuaValue) -> LoadResult<Table> {
    if let LuaValue::Table(table) = returned {
        return Ok(table);
    }
    let module: Table = lua
        .globals()
        .get("module")
        .map_err(|_| LoadError::MissingRender)?;
    match module.get::<LuaValue>("exports") {
        Ok(LuaValue::Table(exports)) => Ok(exports),
        _ => Err(LoadError::MissingRender),
    }
}

fn optional_hook(exports: &Table, name: &str, capability: CapabilityId) -> Option<Function> {
    match exports.get::<LuaValue>(name) {
        Ok(LuaValue::Function(hook)) => Some(hook),
        Ok(LuaValue::Nil) => None,
        Ok(other) => {
            warn!(
                capability = %capability,
                hook = name,
                kind = other.type_name(),
                "Ignoring non-function lifecycle hook"
            );
            None
        },
        Err(e) => {
            warn!(
                capability = %capability,
                hook = name,
                error = %e,
                "Failed to read lifecycle hook"
            );
            None
        },
    }
}

fn read_meta(lua: &Lua, exports: &Table, capability: CapabilityId) -> ModuleMeta {
    match exports.get::<LuaValue>("meta") {
        Ok(LuaValue::Nil) => ModuleMeta::default(),
        Ok(value @ LuaValue::Table(_)) => lua.from_value(value).unwrap_or_else(|e| {
            warn!(capability = %capability, error = %e, "Ignoring malformed module meta");
            ModuleMeta::default()
        }),
        Ok(other) => {
            warn!(
                capability = %capability,
                kind = other.type_name(),
                "Ignoring non-table module meta"
            );
            ModuleMeta::default()
        },
        Err(e) => {
            warn!(capability = %capability, error = %e, "Failed to read module meta");
            ModuleMeta::default()
        },
    }
}
