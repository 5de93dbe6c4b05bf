//! The shared state channel.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{StateError, StateResult};
use crate::subscriber::{FnSubscriber, StateSubscriber, SubscriberId, SubscriberRegistry};

/// A key/value mapping held by the channel.
pub type StateMap = serde_json::Map<String, Value>;

/// A published, immutable snapshot of the channel.
pub type StateSnapshot = Arc<StateMap>;

struct Inner {
    current: RwLock<StateSnapshot>,
    registry: SubscriberRegistry,
}

/// Observable key/value bag shared by the host and every mounted module.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Inner>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("keys", &self.get().len())
            .field("subscribers", &self.inner.registry.len())
            .finish()
    }
}

impl SharedState {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(StateMap::new())
    }

    /// Create a channel seeded with `initial`.
    #[must_use]
    pub fn with_initial(initial: StateMap) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(Arc::new(initial)),
                registry: SubscriberRegistry::new(),
            }),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn get(&self) -> StateSnapshot {
        Arc::clone(
            &self
                .inner
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// A single value from the current snapshot.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<Value> {
        self.get().get(key).cloned()
    }

    /// Merge `partial` into a new snapshot, publish it, and notify every
    /// subscriber once.
    ///
    /// Keys in `partial` replace the same keys of the previous snapshot;
    /// other keys carry over. Returns the number of subscribers notified.
    pub fn set(&self, partial: StateMap) -> usize {
        let snapshot = {
            let mut current = self
                .inner
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let mut merged = StateMap::clone(&current);
            let changed: Vec<String> = partial.keys().cloned().collect();
            merged.extend(partial);
            let snapshot = Arc::new(merged);
            *current = Arc::clone(&snapshot);
            trace!(keys = ?changed, "Shared state merged");
            snapshot
        };

        // Notify outside the write lock so subscribers may call back in.
        let notified = self.inner.registry.notify(&snapshot, self);
        debug!(
            keys = snapshot.len(),
            subscribers = notified,
            "Shared state published"
        );
        notified
    }

    /// Merge a JSON value that must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotAnObject`] if `value` is not a JSON object.
    pub fn set_value(&self, value: Value) -> StateResult<usize> {
        match value {
            Value::Object(partial) => Ok(self.set(partial)),
            other => Err(StateError::NotAnObject(json_kind(&other))),
        }
    }

    /// Register a subscriber for every subsequent merge.
    pub fn subscribe(&self, subscriber: Arc<dyn StateSubscriber>) -> SubscriberId {
        self.inner.registry.register(subscriber)
    }

    /// Register a closure for every subsequent merge.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriberId
    where
        F: Fn(&StateSnapshot, &SharedState) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber::new(name, handler)))
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.registry.unregister(id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The subscriber registry behind this channel.
    #[must_use]
    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.inner.registry
    }

    /// Whether two handles refer to the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
