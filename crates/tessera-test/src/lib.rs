//! Tessera Test - Shared test utilities for the Tessera module host.
//!
//! This crate provides a scriptable execution boundary, Lua module fixtures
//! and registry fixtures for use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tessera-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_core::CapabilityId;
//! use tessera_test::{COUNTER_MODULE, MockBridge, sample_registry};
//!
//! #[tokio::test]
//! async fn test_mount_counter() {
//!     let bridge = Arc::new(
//!         MockBridge::new()
//!             .with_registry(sample_registry())
//!             .with_module(CapabilityId::new(7), COUNTER_MODULE),
//!     );
//!     // build a host over `bridge` ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;
pub mod modules;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
pub use modules::*;
