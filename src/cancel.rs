//! Cancellation utilities
//!
//! A [`CancellationToken`] combines an optional parent token with an
//! internally owned timeout. It aborts at most once and records why: a
//! caller abort, or its own timer firing. Listeners for the two causes are
//! kept separately so the orchestrator can tell them apart.

use crate::error::HttpError;
use crate::types::Timeout;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Why a token aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Aborted by a caller (directly, through a parent, or via bulk abort).
    Aborted,
    /// The token's own timer fired.
    TimedOut { after: Duration },
}

impl AbortReason {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The taxonomy entry this reason maps to.
    pub fn to_error(&self) -> HttpError {
        match self {
            Self::Aborted => HttpError::AbortError,
            Self::TimedOut { after } => HttpError::TimeoutError { after: *after },
        }
    }
}

/// Identifies one listener registration on a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&AbortReason) + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Abort,
    Timeout,
    /// Fires for either cause; used to chain derived tokens.
    Any,
}

impl ListenerKind {
    fn accepts(self, reason: &AbortReason) -> bool {
        match self {
            Self::Any => true,
            Self::Abort => !reason.is_timeout(),
            Self::Timeout => reason.is_timeout(),
        }
    }
}

#[derive(Default)]
struct State {
    reason: Option<AbortReason>,
    listeners: Vec<(ListenerId, ListenerKind, Listener)>,
    next_listener: u64,
    timer: Option<JoinHandle<()>>,
    parent: Option<(Weak<Inner>, ListenerId)>,
    settled: bool,
}

struct Inner {
    id: u64,
    token: tokio_util::sync::CancellationToken,
    state: Mutex<State>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

/// A cloneable, shareable "this call should stop" signal.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
                token: tokio_util::sync::CancellationToken::new(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// A token that aborts when `parent` does, with the parent's reason.
    pub fn derive(parent: Option<&CancellationToken>) -> Self {
        let token = Self::new();
        if let Some(parent) = parent {
            token.follow(parent);
        }
        token
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process-unique id of this token (shared by its clones).
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Chain this token to `parent`. If the parent already aborted, this
    /// token aborts right away with the same reason.
    pub fn follow(&self, parent: &CancellationToken) {
        let already = {
            let mut parent_state = parent.state();
            match &parent_state.reason {
                Some(reason) => Some(reason.clone()),
                None => {
                    let child = Arc::downgrade(&self.inner);
                    let listener: Listener = Arc::new(move |reason: &AbortReason| {
                        if let Some(inner) = child.upgrade() {
                            CancellationToken { inner }.abort_with(reason.clone());
                        }
                    });
                    let id = push_listener(&mut parent_state, ListenerKind::Any, listener);
                    drop(parent_state);
                    self.state().parent = Some((Arc::downgrade(&parent.inner), id));
                    None
                }
            }
        };
        if let Some(reason) = already {
            self.abort_with(reason);
        }
    }

    /// Stop following the parent token, if any.
    pub fn detach(&self) {
        let link = self.state().parent.take();
        if let Some((parent, id)) = link
            && let Some(inner) = parent.upgrade()
        {
            CancellationToken { inner }.remove_listener(id);
        }
    }

    /// Arm a one-shot timer. `Timeout::Never` arms nothing, and a timer that
    /// is already armed is left alone.
    pub fn apply_timeout(&self, timeout: Timeout) -> Result<(), HttpError> {
        let Some(after) = timeout.duration()? else {
            return Ok(());
        };

        let mut state = self.state();
        if state.reason.is_some() || state.timer.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            HttpError::InvalidArgument(format!("A timeout needs a running tokio runtime: {e}"))
        })?;
        let weak = Arc::downgrade(&self.inner);
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                CancellationToken { inner }.abort_with(AbortReason::TimedOut { after });
            }
        }));
        Ok(())
    }

    /// Cancel an armed timer without touching the aborted flag. Idempotent.
    pub fn clear_timeout(&self) {
        let timer = self.state().timer.take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    /// Freeze the token once the guarded work has finished: the timer is
    /// cancelled and later aborts are ignored. Returns the reason if the token
    /// had already aborted, in which case that abort decides the outcome.
    pub fn settle(&self) -> Option<AbortReason> {
        let timer = {
            let mut state = self.state();
            if let Some(reason) = &state.reason {
                return Some(reason.clone());
            }
            state.settled = true;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        None
    }

    pub fn is_timer_armed(&self) -> bool {
        self.state().timer.is_some()
    }

    /// Abort on behalf of the caller. Returns `false` if already aborted or
    /// settled.
    pub fn abort(&self) -> bool {
        self.abort_with(AbortReason::Aborted)
    }

    /// Abort with an explicit reason. Only the first call has any effect.
    pub fn abort_with(&self, reason: AbortReason) -> bool {
        let (timer, listeners) = {
            let mut state = self.state();
            if state.reason.is_some() || state.settled {
                return false;
            }
            state.reason = Some(reason.clone());
            let listeners: Vec<Listener> = state
                .listeners
                .iter()
                .filter(|(_, kind, _)| kind.accepts(&reason))
                .map(|(_, _, l)| l.clone())
                .collect();
            (state.timer.take(), listeners)
        };
        if let Some(timer) = timer {
            timer.abort();
        }

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&reason))).is_err() {
                tracing::warn!(
                    target: crate::defaults::LOG_TARGET,
                    token = self.inner.id,
                    "cancellation listener panicked"
                );
            }
        }
        // Flip the observable flag last so waiters see a fully notified token.
        self.inner.token.cancel();
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.state().reason.clone()
    }

    /// Resolves once the token has aborted.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// Run `listener` when the token is aborted by a caller.
    pub fn on_abort<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AbortReason) + Send + Sync + 'static,
    {
        push_listener(&mut self.state(), ListenerKind::Abort, Arc::new(listener))
    }

    /// Run `listener` when the token's own timer fires.
    pub fn on_timeout<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AbortReason) + Send + Sync + 'static,
    {
        push_listener(&mut self.state(), ListenerKind::Timeout, Arc::new(listener))
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(lid, _, _)| *lid != id);
        state.listeners.len() != before
    }

    pub(crate) fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn push_listener(state: &mut State, kind: ListenerKind, listener: Listener) -> ListenerId {
    state.next_listener += 1;
    let id = ListenerId(state.next_listener);
    state.listeners.push((id, kind, listener));
    id
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("CancellationToken")
            .field("id", &self.inner.id)
            .field("reason", &state.reason)
            .field("timer_armed", &state.timer.is_some())
            .field("settled", &state.settled)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Create a standalone token that can be shared across several calls.
pub fn new_cancel_token() -> CancellationToken {
    CancellationToken::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn first_reason_wins() {
        let token = CancellationToken::new();
        assert!(token.abort_with(AbortReason::TimedOut {
            after: Duration::from_millis(5)
        }));
        assert!(!token.abort());
        assert!(token.is_aborted());
        assert_eq!(
            token.reason(),
            Some(AbortReason::TimedOut {
                after: Duration::from_millis(5)
            })
        );
    }

    #[test]
    fn listeners_do_not_overwrite_each_other() {
        let token = CancellationToken::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let s1 = seen.clone();
        token.on_abort(move |_| s1.lock().unwrap().push("caller"));
        let s2 = seen.clone();
        token.on_abort(move |_| s2.lock().unwrap().push("orchestrator"));
        let s3 = seen.clone();
        token.on_timeout(move |_| s3.lock().unwrap().push("timeout"));

        token.abort();
        token.abort();
        assert_eq!(*seen.lock().unwrap(), ["caller", "orchestrator"]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let id = token.on_abort(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(token.remove_listener(id));
        assert!(!token.remove_listener(id));
        token.abort();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicU64::new(0));
        token.on_abort(|_| panic!("listener failure"));
        let h = hits.clone();
        token.on_abort(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        token.abort();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(token.is_aborted());
    }

    #[test]
    fn derived_token_follows_parent_reason() {
        let parent = CancellationToken::new();
        let child = CancellationToken::derive(Some(&parent));
        parent.abort_with(AbortReason::TimedOut {
            after: Duration::from_millis(10),
        });
        assert!(child.is_aborted());
        assert!(child.reason().unwrap().is_timeout());
    }

    #[test]
    fn deriving_from_aborted_parent_aborts_immediately() {
        let parent = CancellationToken::new();
        parent.abort();
        let child = CancellationToken::derive(Some(&parent));
        assert_eq!(child.reason(), Some(AbortReason::Aborted));
    }

    #[test]
    fn child_abort_does_not_reach_parent() {
        let parent = CancellationToken::new();
        let child = CancellationToken::derive(Some(&parent));
        child.abort();
        assert!(!parent.is_aborted());
    }

    #[test]
    fn detached_child_ignores_parent() {
        let parent = CancellationToken::new();
        let child = CancellationToken::derive(Some(&parent));
        child.detach();
        parent.abort();
        assert!(!child.is_aborted());
    }

    #[tokio::test]
    async fn negative_timeout_is_rejected_without_arming() {
        let token = CancellationToken::new();
        let err = token.apply_timeout(Timeout::Millis(-1)).unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument(_)));
        assert!(!token.is_timer_armed());
    }

    #[tokio::test]
    async fn never_arms_nothing() {
        let token = CancellationToken::new();
        token.apply_timeout(Timeout::Never).unwrap();
        assert!(!token.is_timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_fires_on_next_tick() {
        let token = CancellationToken::new();
        token.apply_timeout(Timeout::Millis(0)).unwrap();
        tokio::time::timeout(Duration::from_millis(1), token.cancelled())
            .await
            .expect("timer should fire");
        assert_eq!(
            token.reason(),
            Some(AbortReason::TimedOut {
                after: Duration::ZERO
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_notifies_timeout_listeners_only() {
        let token = CancellationToken::new();
        let aborts = Arc::new(AtomicU64::new(0));
        let timeouts = Arc::new(AtomicU64::new(0));
        let a = aborts.clone();
        token.on_abort(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let t = timeouts.clone();
        token.on_timeout(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });

        token.apply_timeout(Timeout::Millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(aborts.load(Ordering::SeqCst), 0);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
        assert!(!token.is_timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timer_never_fires() {
        let token = CancellationToken::new();
        token.apply_timeout(Timeout::Millis(50)).unwrap();
        token.clear_timeout();
        token.clear_timeout();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!token.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn settled_token_ignores_its_timer_and_callers() {
        let token = CancellationToken::new();
        let timeouts = Arc::new(AtomicU64::new(0));
        let t = timeouts.clone();
        token.on_timeout(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });
        token.apply_timeout(Timeout::Millis(50)).unwrap();

        assert_eq!(token.settle(), None);
        assert!(!token.is_timer_armed());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!token.abort());
        assert!(!token.is_aborted());
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn settling_an_aborted_token_reports_the_reason() {
        let token = CancellationToken::new();
        token.abort_with(AbortReason::TimedOut {
            after: Duration::from_millis(5),
        });
        assert!(token.settle().unwrap().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_clears_the_timer() {
        let token = CancellationToken::new();
        token.apply_timeout(Timeout::Millis(50)).unwrap();
        token.abort();
        assert!(!token.is_timer_armed());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(token.reason(), Some(AbortReason::Aborted));
    }
}
