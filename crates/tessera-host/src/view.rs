//! Rendered output and the host-owned render target.
//!
//! Modules describe what they want displayed as a tree of [`ViewNode`]s and
//! hand it to `container:mount(node)`. The [`Container`] belongs to the
//! host; a module only ever sees a generation-stamped [`RenderTarget`]
//! pointing at it, so writes from a module the host has since moved on from
//! are silently dropped.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use mlua::{FromLua, Lua, LuaSerdeExt, UserData, UserDataMethods, Value as LuaValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Deepest view tree accepted from a module.
pub const MAX_VIEW_DEPTH: usize = 64;

/// Tag given to `ui.fragment` and to bare child lists.
pub const FRAGMENT_TAG: &str = "fragment";

/// One node of a rendered view tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewNode {
    /// A run of text.
    Text(String),
    /// An element with attributes and children.
    Element {
        /// Element tag (`div`, `button`, ...).
        tag: String,
        /// Attribute values. Function-valued attributes are dropped.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, serde_json::Value>,
        /// Child nodes in order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<ViewNode>,
    },
}

impl ViewNode {
    /// A text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// An element without attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute. No-op on text nodes.
    #[must_use]
    pub fn with_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.insert(key.into(), value.into());
        }
        self
    }

    /// Append a child. No-op on text nodes.
    #[must_use]
    pub fn with_child(mut self, child: ViewNode) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// The element tag, or `None` for text.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Element { tag, .. } => Some(tag),
        }
    }

    /// An attribute of an element.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        match self {
            Self::Text(_) => None,
            Self::Element { attrs, .. } => attrs.get(key),
        }
    }

    /// Child nodes; empty for text.
    #[must_use]
    pub fn children(&self) -> &[ViewNode] {
        match self {
            Self::Text(_) => &[],
            Self::Element { children, .. } => children,
        }
    }

    /// All text in document order, concatenated.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            },
        }
    }

    /// First element with `tag`, depth-first, including `self`.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&ViewNode> {
        if self.tag() == Some(tag) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(tag))
    }

    /// Indented plain-text outline, one node per line.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            Self::Text(text) => {
                let _ = writeln!(out, "{indent}{text:?}");
            },
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                let _ = write!(out, "{indent}<{tag}");
                for (key, value) in attrs {
                    let _ = write!(out, " {key}={value}");
                }
                let _ = writeln!(out, ">");
                for child in children {
                    child.write_outline(out, depth.saturating_add(1));
                }
            },
        }
    }
}

impl std::fmt::Display for ViewNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.outline())
    }
}

impl FromLua for ViewNode {
    fn from_lua(value: LuaValue, lua: &Lua) -> mlua::Result<Self> {
        node_from_lua(value, lua, 0)
    }
}

fn node_from_lua(value: LuaValue, lua: &Lua, depth: usize) -> mlua::Result<ViewNode> {
    if depth > MAX_VIEW_DEPTH {
        return Err(mlua::Error::runtime(format!(
            "view tree is deeper than {MAX_VIEW_DEPTH} levels"
        )));
    }
    match value {
        LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_) => {
            String::from_lua(value, lua).map(ViewNode::Text)
        },
        LuaValue::Boolean(b) => Ok(ViewNode::Text(b.to_string())),
        LuaValue::Table(table) => {
            let Some(tag) = table.get::<Option<String>>("tag")? else {
                // A bare list of children.
                let children = children_from_lua(LuaValue::Table(table), lua, depth)?;
                return Ok(ViewNode::Element {
                    tag: FRAGMENT_TAG.to_owned(),
                    attrs: BTreeMap::new(),
                    children,
                });
            };

            let mut attrs = BTreeMap::new();
            if let Some(attr_table) = table.get::<Option<mlua::Table>>("attrs")? {
                for pair in attr_table.pairs::<String, LuaValue>() {
                    let (key, raw) = pair?;
                    if matches!(
                        raw,
                        LuaValue::Function(_) | LuaValue::Thread(_) | LuaValue::UserData(_)
                    ) {
                        continue;
                    }
                    attrs.insert(key, lua.from_value(raw)?);
                }
            }

            let children = children_from_lua(table.get::<LuaValue>("children")?, lua, depth)?;
            Ok(ViewNode::Element {
                tag,
                attrs,
                children,
            })
        },
        other => Err(mlua::Error::runtime(format!(
            "cannot render a {} value",
            other.type_name()
        ))),
    }
}

fn children_from_lua(value: LuaValue, lua: &Lua, depth: usize) -> mlua::Result<Vec<ViewNode>> {
    let next = depth.saturating_add(1);
    match value {
        LuaValue::Nil => Ok(Vec::new()),
        LuaValue::Table(list) if list.get::<Option<String>>("tag")?.is_none() => list
            .sequence_values::<LuaValue>()
            .map(|child| node_from_lua(child?, lua, next))
            .collect(),
        single => Ok(vec![node_from_lua(single, lua, next)?]),
    }
}

#[derive(Debug, Default)]
struct ContainerState {
    generation: u64,
    root: Option<ViewNode>,
    writes: u64,
}

/// A host-owned render target holding at most one root node.
#[derive(Debug)]
pub struct Container {
    id: String,
    state: Mutex<ContainerState>,
}

impl Container {
    /// Create an empty container.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(ContainerState::default()),
        }
    }

    /// Container id, as reported to modules by `container:id()`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The currently displayed tree.
    #[must_use]
    pub fn root(&self) -> Option<ViewNode> {
        self.lock().root.clone()
    }

    /// Whether nothing is displayed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().root.is_none()
    }

    /// Current generation. Targets stamped with an older one are inert.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Number of accepted writes over the container's lifetime.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Move to `generation` and clear the display.
    pub(crate) fn reset(&self, generation: u64) {
        let mut state = self.lock();
        state.generation = generation;
        state.root = None;
    }

    /// A module-facing handle for `generation`.
    pub(crate) fn target(self: &Arc<Self>, generation: u64) -> RenderTarget {
        RenderTarget {
            container: Arc::clone(self),
            generation,
        }
    }

    fn write(&self, generation: u64, root: Option<ViewNode>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            trace!(
                container = %self.id,
                stale = generation,
                current = state.generation,
                "Dropping write from stale render target"
            );
            return false;
        }
        state.root = root;
        state.writes = state.writes.saturating_add(1);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ContainerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The `container` argument a module's `render` receives.
///
/// Lua methods: `container:mount(node)`, `container:clear()` (both return
/// whether the write was applied) and `container:id()`.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    container: Arc<Container>,
    generation: u64,
}

impl RenderTarget {
    /// Replace the displayed tree. Returns `false` if this target is stale.
    pub fn mount(&self, node: ViewNode) -> bool {
        self.container.write(self.generation, Some(node))
    }

    /// Clear the display. Returns `false` if this target is stale.
    pub fn clear(&self) -> bool {
        self.container.write(self.generation, None)
    }

    /// Whether writes through this target still reach the container.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.container.generation() == self.generation
    }
}

impl UserData for RenderTarget {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("mount", |_, this, node: ViewNode| Ok(this.mount(node)));
        methods.add_method("clear", |_, this, ()| Ok(this.clear()));
        methods.add_method("id", |_, this, ()| Ok(this.container.id().to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_and_queries() {
        let node = ViewNode::element("div")
            .with_attr("class", "card")
            .with_child(ViewNode::element("h1").with_child(ViewNode::text("Title")))
            .with_child(ViewNode::text(" body"));

        assert_eq!(node.tag(), Some("div"));
        assert_eq!(node.attr("class"), Some(&json!("card")));
        assert_eq!(node.text_content(), "Title body");
        assert_eq!(node.find("h1").unwrap().text_content(), "Title");
        assert!(node.find("table").is_none());
    }

    #[test]
    fn test_json_shape_is_untagged() {
        let node = ViewNode::element("p").with_child(ViewNode::text("hi"));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"tag": "p", "children": ["hi"]})
        );
        let back: ViewNode =
            serde_json::from_value(json!({"tag": "p", "children": ["hi"]})).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_outline() {
        let node = ViewNode::element("ul")
            .with_attr("id", "list")
            .with_child(ViewNode::element("li").with_child(ViewNode::text("one")));
        assert_eq!(node.outline(), "<ul id=\"list\">\n  <li>\n    \"one\"\n");
    }

    #[test]
    fn test_from_lua_tables() {
        let lua = Lua::new();
        let value: LuaValue = lua
            .load(
                r#"return {
                    tag = "div",
                    attrs = { class = "x", count = 3, onclick = function() end },
                    children = { "a", 2, { tag = "span", children = "b" }, { "c", "d" } },
                }"#,
            )
            .eval()
            .unwrap();
        let node = ViewNode::from_lua(value, &lua).unwrap();

        assert_eq!(node.attr("class"), Some(&json!("x")));
        assert_eq!(node.attr("count"), Some(&json!(3)));
        assert!(node.attr("onclick").is_none());
        assert_eq!(node.children().len(), 4);
        assert_eq!(node.children()[1], ViewNode::text("2"));
        assert_eq!(node.children()[3].tag(), Some(FRAGMENT_TAG));
        assert_eq!(node.text_content(), "a2bcd");
    }

    #[test]
    fn test_from_lua_rejects_functions_and_cycles() {
        let lua = Lua::new();
        let func: LuaValue = lua.load("return function() end").eval().unwrap();
        assert!(ViewNode::from_lua(func, &lua).is_err());

        let cyclic: LuaValue = lua
            .load("local t = { tag = 'div' }; t.children = { t }; return t")
            .eval()
            .unwrap();
        assert!(ViewNode::from_lua(cyclic, &lua).is_err());
    }

    #[test]
    fn test_stale_target_cannot_write() {
        let container = Arc::new(Container::new("main"));
        container.reset(1);
        let old = container.target(1);
        assert!(old.mount(ViewNode::text("first")));

        container.reset(2);
        assert!(container.is_empty());
        assert!(!old.is_current());
        assert!(!old.mount(ViewNode::text("late")));
        assert!(!old.clear());
        assert!(container.is_empty());

        let current = container.target(2);
        assert!(current.mount(ViewNode::text("second")));
        assert_eq!(container.root(), Some(ViewNode::text("second")));
        assert_eq!(container.write_count(), 2);
    }
}
