//! Lua module fixtures.
//!
//! Each constant is the source text a boundary would return for one
//! capability. Modules that track lifecycle do it through shared state so
//! tests can observe them from Rust.

/// Renders a counter panel and records its lifecycle in shared state.
///
/// - `renders` is incremented by every `render`
/// - `cleanups` by every cleanup closure call
/// - `activated` / `deactivated` by the hooks
pub const COUNTER_MODULE: &str = r#"
local M = {}
local last_props

M.meta = { title = "Counter", icon = "hash", version = "1.0.0" }

local function bump(props, key)
  local state = props.get_shared_state()
  props.set_shared_state({ [key] = (state[key] or 0) + 1 })
end

function M.render(container, props, ui, dom)
  last_props = props
  bump(props, "renders")
  dom.render(ui.element("div", { class = "counter" }, {
    ui.element("h1", {}, { ui.text("Counter") }),
    ui.element("span", { id = "capability" }, { ui.text(props.capability_id) }),
  }), container)
  return function()
    bump(props, "cleanups")
  end
end

function M.on_activate()
  if last_props then bump(last_props, "activated") end
end

function M.on_deactivate()
  if last_props then bump(last_props, "deactivated") end
end

return M
"#;

/// Populates `module.exports` instead of returning a table, and shows
/// `initial_data.text`.
pub const EXPORTS_MODULE: &str = r#"
exports.meta = { title = "Notes", icon = "note" }

exports.render = function(container, props, ui, dom)
  local data = props.initial_data or {}
  container:mount(ui.element("p", { class = "note" }, { ui.text(data.text or "empty") }))
end
"#;

/// Exports metadata but no `render`.
pub const NO_RENDER: &str = r#"
return { meta = { title = "Broken" } }
"#;

/// Does not compile.
pub const SYNTAX_ERROR: &str = r#"
return { render = function( end
"#;

/// Raises while being evaluated.
pub const THROWING: &str = r#"
error("module exploded during evaluation")
"#;

/// Evaluates fine but raises from `render`.
pub const RENDER_ERROR: &str = r#"
return {
  render = function(container, props)
    error("render exploded")
  end,
}
"#;

/// Calls capability 42 from `render` and shows the echoed query.
pub const INVOKE_MODULE: &str = r#"
return {
  render = function(container, props, ui, dom)
    local result = props.invoke_capability(42, { query = "status" })
    dom.render(ui.element("pre", { success = result.success }, {
      ui.text(result.echo.query),
    }), container)
  end,
}
"#;

/// Subscribes to shared state and re-renders the `theme` key on change.
/// Returns no cleanup, so its subscription must be released by the host.
pub const SUBSCRIBER_MODULE: &str = r#"
return {
  render = function(container, props, ui, dom)
    local seen = 0
    props.subscribe_to_state(function(state)
      seen = seen + 1
      container:mount(ui.element("span", { seen = seen }, { ui.text(state.theme or "none") }))
    end)
    dom.render(ui.element("span", { seen = seen }, { ui.text("none") }), container)
  end,
}
"#;

/// Calls `props.on_close()` from `render`.
pub const CLOSING_MODULE: &str = r#"
return {
  render = function(container, props, ui, dom)
    if props.on_close then props.on_close() end
    dom.render(ui.text("closing"), container)
  end,
}
"#;

/// Allocates without bound while being evaluated.
pub const HUNGRY_MODULE: &str = r#"
local hoard = {}
for i = 1, math.maxinteger do
  hoard[i] = string.rep("x", 4096) .. i
end
return { render = function() end }
"#;

/// Never finishes evaluating.
pub const RUNAWAY_MODULE: &str = r#"
while true do end
return { render = function() end }
"#;

/// Number of writes [`PINGER_MODULE`] makes from `render`.
pub const PING_ROUNDS: i64 = 5000;

/// Subscribes to shared state, then writes `ping-<capability_id>`
/// [`PING_ROUNDS`] times from inside `render`. Once its listener sees the
/// final write it publishes how many notifications it had heard as
/// `heard-<capability_id>`.
pub const PINGER_MODULE: &str = r#"
local ROUNDS = 5000
return {
  render = function(container, props, ui, dom)
    local key = "ping-" .. props.capability_id
    local heard, reported = 0, false
    props.subscribe_to_state(function(state)
      heard = heard + 1
      if not reported and state[key] == ROUNDS then
        reported = true
        props.set_shared_state({ ["heard-" .. props.capability_id] = heard })
      end
    end)
    for i = 1, ROUNDS do
      props.set_shared_state({ [key] = i })
    end
    dom.render(ui.element("span", {}, { ui.text(key) }), container)
  end,
}
"#;

/// Capability that [`ACTIVATING_MODULE`] invokes from `on_activate`.
pub const ACTIVATION_TARGET: u32 = 50;

/// Suspends `on_activate` on an invocation of [`ACTIVATION_TARGET`] and
/// publishes the order of its lifecycle calls as `lifecycle` from
/// `on_deactivate`.
pub const ACTIVATING_MODULE: &str = r#"
local log, saved = {}, nil
return {
  render = function(container, props, ui, dom)
    saved = props
    dom.render(ui.text("activating"), container)
    return function()
      log[#log + 1] = "cleanup"
    end
  end,
  on_activate = function()
    saved.invoke_capability(50, { step = "activate" })
    log[#log + 1] = "activate"
  end,
  on_deactivate = function()
    log[#log + 1] = "deactivate"
    saved.set_shared_state({ lifecycle = table.concat(log, ",") })
  end,
}
"#;
