//! Tessera Core - Foundation types for the Tessera module host.
//!
//! This crate provides:
//! - [`CapabilityId`]: the numeric identifier of a backend capability
//! - [`RegistryEntry`] / [`RegistryResponse`]: capability descriptors as
//!   served by the execution boundary
//! - [`CapabilityBridge`]: the request/response execution boundary the host
//!   talks to, plus the request builders for the two system actions it needs
//! - [`DirectoryBridge`]: a filesystem-backed boundary for offline use
//!
//! Nothing in this crate knows about sandboxes or rendering; it only
//! describes what crosses the boundary.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod bridge;
pub mod directory;
pub mod error;
pub mod id;
pub mod registry;

pub use bridge::{
    ACTION_GET_REGISTRY, ACTION_GET_UI_COMPONENT, CapabilityBridge, SYSTEM_CAPABILITY,
    registry_request, source_from_response, ui_component_request,
};
pub use directory::DirectoryBridge;
pub use error::{BridgeError, BridgeResult};
pub use id::CapabilityId;
pub use registry::{RegistryEntry, RegistryResponse};
