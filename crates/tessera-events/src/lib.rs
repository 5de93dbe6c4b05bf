//! Tessera Events - Shared state channel for the Tessera module host.
//!
//! Independently loaded modules never hold references to each other. They
//! coordinate through one observable key/value bag:
//!
//! - [`SharedState::get`] returns the current snapshot
//! - [`SharedState::set`] merges a partial mapping into a *new* snapshot and
//!   notifies every subscriber exactly once
//! - [`SharedState::subscribe`] registers a [`StateSubscriber`] and returns a
//!   [`SubscriberId`] to unsubscribe with
//!
//! Snapshots are `Arc`-shared and never mutated after publication, so a
//! consumer holding an older snapshot never observes a half-applied merge.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_events::{FnSubscriber, SharedState, StateMap};
//!
//! let state = SharedState::new();
//! let id = state.subscribe(Arc::new(FnSubscriber::new("logger", |snapshot, _| {
//!     assert!(snapshot.contains_key("theme"));
//! })));
//!
//! let mut partial = StateMap::new();
//! partial.insert("theme".into(), "dark".into());
//! assert_eq!(state.set(partial), 1);
//!
//! assert!(state.unsubscribe(id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod state;
mod subscriber;

pub use error::{StateError, StateResult};
pub use state::{SharedState, StateMap, StateSnapshot};
pub use subscriber::{FnSubscriber, StateSubscriber, SubscriberId, SubscriberRegistry};
