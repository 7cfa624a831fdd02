//! Lifecycle events
//!
//! Every call publishes a fixed sequence of [`RequestEvent`]s. Listeners are
//! registered per [`EventKind`] (or for every kind) on an [`EventBus`]; each
//! client owns one bus and the [`Hub`](crate::hub::Hub) owns the process-wide
//! one.
//!
//! Listeners run synchronously, in registration order. A panicking listener
//! is caught and reported through `tracing`; the remaining listeners and the
//! call itself carry on.

use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::hub::Hub;
use crate::types::{ResponseBody, ResponseStatus};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// The fixed event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Configured,
    Success,
    Error,
    Aborted,
    Timeout,
    Complete,
    AllComplete,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::Configured,
        Self::Success,
        Self::Error,
        Self::Aborted,
        Self::Timeout,
        Self::Complete,
        Self::AllComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Success => "success",
            Self::Error => "error",
            Self::Aborted => "aborted",
            Self::Timeout => "timeout",
            Self::Complete => "complete",
            Self::AllComplete => "all-complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle notification, borrowed for the duration of the publish.
#[derive(Debug)]
pub enum RequestEvent<'a> {
    Configured {
        request_id: &'a str,
        url: &'a Url,
        config: &'a RequestConfig,
    },
    Success {
        request_id: &'a str,
        url: &'a Url,
        status: &'a ResponseStatus,
        body: &'a ResponseBody,
    },
    Error {
        request_id: &'a str,
        error: &'a RequestError,
    },
    Aborted {
        request_id: &'a str,
        url: &'a Url,
    },
    Timeout {
        request_id: &'a str,
        url: &'a Url,
        after: Duration,
    },
    Complete {
        request_id: &'a str,
        url: &'a Url,
        status: Option<&'a ResponseStatus>,
    },
    AllComplete,
}

impl RequestEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Configured { .. } => EventKind::Configured,
            Self::Success { .. } => EventKind::Success,
            Self::Error { .. } => EventKind::Error,
            Self::Aborted { .. } => EventKind::Aborted,
            Self::Timeout { .. } => EventKind::Timeout,
            Self::Complete { .. } => EventKind::Complete,
            Self::AllComplete => EventKind::AllComplete,
        }
    }

    /// Id of the call that produced the event (`None` for `AllComplete`).
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Configured { request_id, .. }
            | Self::Success { request_id, .. }
            | Self::Error { request_id, .. }
            | Self::Aborted { request_id, .. }
            | Self::Timeout { request_id, .. }
            | Self::Complete { request_id, .. } => Some(request_id),
            Self::AllComplete => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&RequestEvent<'_>) + Send + Sync>;

/// Opaque registration handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Subscription {
    id: u64,
    kind: Option<EventKind>,
    listener: Listener,
}

/// An ordered set of listeners.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, kind: Option<EventKind>, listener: Listener) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { id, kind, listener });
        SubscriptionHandle(id)
    }

    /// Listen for one kind of event.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.add(Some(kind), Arc::new(listener))
    }

    /// Listen for every event.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(listener))
    }

    /// Remove a registration. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != handle.0);
        subs.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify matching listeners in registration order.
    pub fn publish(&self, event: &RequestEvent<'_>) {
        let kind = event.kind();
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.kind.is_none_or(|k| k == kind))
            .map(|s| s.listener.clone())
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(
                    target: crate::defaults::LOG_TARGET,
                    event = %kind,
                    request_id = event.request_id().unwrap_or_default(),
                    "event listener panicked"
                );
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish()
    }
}

/// Deliver `event` to the instance bus, then to the hub's bus when `global`.
pub(crate) fn dispatch(instance: &EventBus, hub: &Hub, global: bool, event: &RequestEvent<'_>) {
    tracing::trace!(
        target: crate::defaults::LOG_TARGET,
        event = %event.kind(),
        request_id = event.request_id().unwrap_or_default(),
        global,
        "publish"
    );
    instance.publish(event);
    if global {
        hub.events().publish(event);
    }
}
