//! Process-wide shared state
//!
//! A [`Hub`] owns the process-wide event bus and the registry of in-flight
//! cancellation tokens. Clients hold it by `Arc`; tests build a fresh one
//! each, applications usually share [`Hub::shared`].

use crate::cancel::CancellationToken;
use crate::events::{EventBus, EventKind, RequestEvent, SubscriptionHandle};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static SHARED_HUB: OnceLock<Arc<Hub>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct Hub {
    events: EventBus,
    active: Mutex<Vec<CancellationToken>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lazily created process-wide hub.
    pub fn shared() -> Arc<Hub> {
        SHARED_HUB.get_or_init(|| Arc::new(Hub::new())).clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to an event kind across every client using this hub.
    pub fn register<F>(&self, kind: EventKind, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn register_all<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.events.subscribe_all(listener)
    }

    pub fn unregister(&self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    fn active(&self) -> MutexGuard<'_, Vec<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of calls currently in flight.
    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    /// Abort every call in flight right now.
    ///
    /// The registry is emptied before any token is aborted; calls that start
    /// afterwards are not affected. Returns how many tokens were aborted.
    pub fn abort_all(&self) -> usize {
        let snapshot = std::mem::take(&mut *self.active());
        tracing::debug!(
            target: crate::defaults::LOG_TARGET,
            count = snapshot.len(),
            "aborting all active requests"
        );
        snapshot.iter().filter(|token| token.abort()).count()
    }

    pub(crate) fn track(&self, token: &CancellationToken) {
        self.active().push(token.clone());
    }

    /// Remove `token`; `true` when it was present and the registry is now
    /// empty.
    pub(crate) fn complete(&self, token: &CancellationToken) -> bool {
        let mut active = self.active();
        let before = active.len();
        active.retain(|t| !t.same_as(token));
        active.len() != before && active.is_empty()
    }

    /// Remove `token` without any bookkeeping.
    pub(crate) fn untrack(&self, token: &CancellationToken) {
        self.active().retain(|t| !t.same_as(token));
    }
}
