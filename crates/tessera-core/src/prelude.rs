//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tessera_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::CapabilityId;

// Registry data
pub use crate::{RegistryEntry, RegistryResponse};

// Execution boundary
pub use crate::{BridgeError, BridgeResult, CapabilityBridge, SYSTEM_CAPABILITY};
