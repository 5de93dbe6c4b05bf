//! State subscriber trait and registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::state::{SharedState, StateSnapshot};

/// Trait for shared state subscribers.
///
/// Subscribers are called synchronously from [`SharedState::set`]. They may
/// read, write, subscribe or unsubscribe on the channel they are handed
/// without deadlocking.
pub trait StateSubscriber: Send + Sync {
    /// Called once per merge with the new snapshot.
    fn on_state(&self, snapshot: &StateSnapshot, channel: &SharedState);

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Registration handle for a subscriber.
///
/// Ids are allocated in increasing order; subscribers are notified in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Registration {
    subscriber: Arc<dyn StateSubscriber>,
    active: AtomicBool,
}

/// Registry of shared state subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<BTreeMap<SubscriberId, Arc<Registration>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.len())
            .finish_non_exhaustive()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub fn register(&self, subscriber: Arc<dyn StateSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = subscriber.name().to_string();
        let registration = Arc::new(Registration {
            subscriber,
            active: AtomicBool::new(true),
        });

        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, registration);

        debug!(subscriber_id = %id, subscriber_name = %name, "State subscriber registered");
        id
    }

    /// Unregister a subscriber.
    ///
    /// Returns `true` if the subscriber was registered. A subscriber removed
    /// while a notification round is in progress is not called again in
    /// that round.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        // Drop the registration outside the write lock: a subscriber whose
        // Drop touches the channel must not deadlock against it.
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        match removed {
            Some(registration) => {
                registration.active.store(false, Ordering::Release);
                debug!(subscriber_id = %id, "State subscriber unregistered");
                true
            },
            None => false,
        }
    }

    /// Notify every active subscriber of `snapshot`.
    ///
    /// Returns the number of subscribers that were called.
    pub(crate) fn notify(&self, snapshot: &StateSnapshot, channel: &SharedState) -> usize {
        // Copy the list so subscribers can (un)register during the round.
        let round: Vec<(SubscriberId, Arc<Registration>)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, registration)| (*id, Arc::clone(registration)))
            .collect();

        let mut notified: usize = 0;
        for (id, registration) in round {
            if !registration.active.load(Ordering::Acquire) {
                continue;
            }
            trace!(
                subscriber_id = %id,
                subscriber_name = %registration.subscriber.name(),
                "Notifying state subscriber"
            );

            // One panicking subscriber must not starve the rest.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                registration.subscriber.on_state(snapshot, channel);
            }));
            if let Err(e) = result {
                warn!(
                    subscriber_id = %id,
                    subscriber_name = %registration.subscriber.name(),
                    error = ?e,
                    "State subscriber panicked"
                );
            }
            notified = notified.saturating_add(1);
        }
        notified
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every subscriber.
    pub fn clear(&self) {
        let drained = std::mem::take(
            &mut *self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for registration in drained.values() {
            registration.active.store(false, Ordering::Release);
        }
        debug!(count = drained.len(), "All state subscribers cleared");
    }
}

/// A subscriber backed by a closure.
pub struct FnSubscriber<F>
where
    F: Fn(&StateSnapshot, &SharedState) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&StateSnapshot, &SharedState) + Send + Sync,
{
    /// Create a new closure subscriber.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> StateSubscriber for FnSubscriber<F>
where
    F: Fn(&StateSnapshot, &SharedState) + Send + Sync,
{
    fn on_state(&self, snapshot: &StateSnapshot, channel: &SharedState) {
        (self.handler)(snapshot, channel);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
