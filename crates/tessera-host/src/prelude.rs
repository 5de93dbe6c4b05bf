//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tessera_host::prelude::*;` to import all essential types.

// Runtime owner
pub use crate::{Host, HostSettings};

// Registry
pub use crate::{RegistryCache, RegistrySnapshot, RegistrySource};

// Loading
pub use crate::{LoadError, LoadResult, ModuleLoader, ModuleMeta, Sandbox, UiModule};

// Mounting
pub use crate::{ModuleMount, MountError, MountOptions, MountOutcome, MountPhase, ViewNode};

// Tabs
pub use crate::{CoreTab, TabComposer, TabDescriptor, TabOverrides, TabStrip};
