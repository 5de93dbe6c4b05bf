//! Tessera Host - loads, sandboxes and mounts capability UI modules.
//!
//! The pieces, leaf first:
//!
//! - [`RegistryCache`]: memoized capability descriptors with a built-in
//!   fallback set
//! - [`Sandbox`]: evaluates module source text in an isolated Lua state
//! - [`ModuleLoader`]: retrieves, evaluates, validates and caches modules,
//!   de-duplicating concurrent loads
//! - [`ModuleMount`]: renders one module into a host-owned [`Container`] and
//!   guarantees its cleanup
//! - [`TabComposer`] / [`TabStrip`]: presentation-ready tab descriptors
//! - [`Host`]: owns one of each, plus the shared state channel
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_core::CapabilityId;
//! use tessera_host::{Host, MountOptions};
//!
//! # async fn run() {
//! let host = Host::without_bridge();
//! assert_eq!(host.tabs().core_tabs().len(), 4);
//!
//! let mount = host.mount_component();
//! let outcome = mount.mount(CapabilityId::new(7), MountOptions::new()).await;
//! assert!(!outcome.is_ready());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod host;
mod loader;
mod module;
mod mount;
mod registry;
mod sandbox;
mod tabs;
mod view;

pub use error::{LoadError, LoadResult, MountError, MountResult};
pub use host::{Host, HostSettings};
pub use loader::ModuleLoader;
pub use module::{CloseCallback, ModuleMeta, UiModule};
pub use mount::{ModuleMount, MountOptions, MountOutcome, MountPhase};
pub use registry::{RegistryCache, RegistrySnapshot, RegistrySource};
pub use sandbox::{
    DEFAULT_EVALUATION_TIMEOUT, DEFAULT_MEMORY_LIMIT, INSTRUCTION_CHECK_INTERVAL, Sandbox,
};
pub use tabs::{
    CORE_CATEGORY, CoreTab, DEFAULT_ICON, TabComposer, TabDescriptor, TabOverrides, TabStrip,
    category_icon, default_core_tabs, discovered_tab_id,
};
pub use view::{Container, FRAGMENT_TAG, MAX_VIEW_DEPTH, RenderTarget, ViewNode};
