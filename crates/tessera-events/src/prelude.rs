//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tessera_events::prelude::*;` to import all essential types.

// Channel
pub use crate::{SharedState, StateMap, StateSnapshot};

// Subscribers
pub use crate::{FnSubscriber, StateSubscriber, SubscriberId};

// Errors
pub use crate::{StateError, StateResult};
