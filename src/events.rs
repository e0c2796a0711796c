//! In-page broadcast of session changes.
//!
//! DESIGN
//! ======
//! Listeners are plain callbacks kept in a registry. `emit` snapshots the
//! registry and calls every listener synchronously on the caller's stack, so
//! all current listeners have observed the event when `emit` returns. The
//! registry lock is never held while a listener runs; listeners may emit or
//! unsubscribe re-entrantly.
//!
//! A [`Subscription`] unregisters its listener when dropped, which is how
//! components guarantee cleanup on teardown.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use schema::User;

/// A session change announced to every listener on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Someone on this page authenticated as `User`.
    Login(User),
    /// The session on this page was cleared.
    Logout,
}

impl SessionEvent {
    /// Stable event name, matching the names used on the DOM side.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login(_) => "auth:login",
            Self::Logout => "auth:logout",
        }
    }
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

struct Registry {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// Cloneable handle to one page's event registry.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listener_count()).finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self { registry: Arc::new(Registry { listeners: Mutex::new(Vec::new()), next_id: AtomicU64::new(1) }) }
    }

    /// Register `listener`. It stays registered until the returned guard drops.
    #[must_use = "dropping the subscription unregisters the listener immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription { registry: Arc::downgrade(&self.registry), id }
    }

    /// Deliver `event` to every listener registered at call time.
    pub fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(event = event.name(), listeners = listeners.len(), "session event");
        for listener in listeners {
            listener(event);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Registration guard returned by [`EventBus::subscribe`].
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}

impl Subscription {
    /// Unregister now. Equivalent to dropping the guard.
    pub fn cancel(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        registry
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}
