//! Event subscriptions keyed by method name.
//!
//! One active handler per method; registering again replaces the previous
//! handler. Lookups take the read side of an `RwLock` so concurrent readers
//! never contend, while `on`/`off` take the write side. Shutdown closes the
//! registry under the same write lock, so no registration outlives it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

/// Error type an event handler may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of an event handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Callback invoked with an event's `params`.
pub type EventHandler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync>;

/// Result of [`EventRegistry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Subscribe {
    /// No handler existed for the method.
    Registered,
    /// A previous handler was replaced.
    Replaced,
    /// The registry was closed; nothing was installed.
    Closed,
}

#[derive(Default)]
struct Subscriptions {
    handlers: HashMap<String, EventHandler>,
    closed: bool,
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    state: RwLock<Subscriptions>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl EventRegistry {
    fn read(&self) -> RwLockReadGuard<'_, Subscriptions> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Subscriptions> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `handler` for `method` unless the registry is closed.
    pub(crate) fn insert(&self, method: &str, handler: EventHandler) -> Subscribe {
        let mut state = self.write();
        if state.closed {
            return Subscribe::Closed;
        }
        match state.handlers.insert(method.to_owned(), handler) {
            Some(_) => Subscribe::Replaced,
            None => Subscribe::Registered,
        }
    }

    /// Remove the handler for `method`, returning whether one existed.
    pub(crate) fn remove(&self, method: &str) -> bool {
        self.write().handlers.remove(method).is_some()
    }

    /// Clone out the handler for `method`; the lock is released on return.
    pub(crate) fn get(&self, method: &str) -> Option<EventHandler> {
        self.read().handlers.get(method).cloned()
    }

    /// Drop every handler and refuse later inserts.
    pub(crate) fn close(&self) {
        let mut state = self.write();
        state.closed = true;
        state.handlers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.read().handlers.len()
    }
}
