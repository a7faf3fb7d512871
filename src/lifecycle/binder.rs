//! # Lifecycle binder.
//!
//! [`LifecycleBinder`] observes a [`Lifecycle`] and turns it into two
//! callbacks:
//! - `on_ready`: once the host reaches `Created` (attach point),
//! - `on_unbind`: once the host is destroyed or [`unbind`](LifecycleBinder::unbind)
//!   is called, whichever comes first.
//!
//! ## Rules
//! - Each callback runs at most once; `on_unbind` runs only after `on_ready`.
//! - Binding a host that is already `Created` runs `on_ready` inside `bind_to`.
//! - `unbind()` before the host became ready drops both callbacks.
//! - Callbacks run under the binder's own lock, so `on_ready` and `on_unbind`
//!   never overlap; they must not call back into the same binder.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::host::{Lifecycle, LifecycleState};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Bound,
    Ready,
    Unbound,
}

struct BinderState {
    phase: Phase,
    on_ready: Option<Callback>,
    on_unbind: Option<Callback>,
}

struct BinderInner {
    state: Mutex<BinderState>,
    token: CancellationToken,
}

impl BinderInner {
    fn ready(&self) {
        let mut st = self.state.lock();
        if st.phase != Phase::Bound {
            return;
        }
        st.phase = Phase::Ready;
        if let Some(cb) = st.on_ready.take() {
            cb();
        }
    }

    fn finish(&self) -> bool {
        let mut st = self.state.lock();
        let was = st.phase;
        st.phase = Phase::Unbound;
        st.on_ready = None;
        let on_unbind = st.on_unbind.take();
        if was == Phase::Ready {
            if let Some(cb) = on_unbind {
                cb();
            }
        }
        was != Phase::Unbound
    }
}

/// Attach/detach binder driven by a host lifecycle.
#[derive(Clone)]
pub struct LifecycleBinder {
    inner: Arc<BinderInner>,
}

impl LifecycleBinder {
    /// Creates an unbound binder.
    pub fn new<R, U>(on_ready: R, on_unbind: U) -> Self
    where
        R: FnOnce() + Send + 'static,
        U: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(BinderInner {
                state: Mutex::new(BinderState {
                    phase: Phase::Idle,
                    on_ready: Some(Box::new(on_ready)),
                    on_unbind: Some(Box::new(on_unbind)),
                }),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Starts observing `lifecycle` on the current tokio runtime.
    ///
    /// If the host is already at least `Created`, `on_ready` runs before this
    /// returns.
    ///
    /// Returns `false` if the binder was already bound or unbound.
    pub fn bind_to(&self, lifecycle: &Lifecycle) -> bool {
        {
            let mut st = self.inner.state.lock();
            if st.phase != Phase::Idle {
                return false;
            }
            st.phase = Phase::Bound;
        }
        // A host that is already created attaches before `bind_to` returns.
        if lifecycle.is_at_least(LifecycleState::Created) {
            self.inner.ready();
        }

        let inner = Arc::clone(&self.inner);
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            let created = tokio::select! {
                biased;
                _ = inner.token.cancelled() => return,
                created = lifecycle.wait_at_least(LifecycleState::Created) => created,
            };
            if !created {
                inner.finish();
                return;
            }
            inner.ready();

            tokio::select! {
                _ = inner.token.cancelled() => {}
                _ = lifecycle.destroyed() => {}
            }
            inner.finish();
        });
        true
    }

    /// Stops observing. Runs `on_unbind` if `on_ready` already ran.
    ///
    /// Returns `false` if the binder was already unbound.
    pub fn unbind(&self) -> bool {
        self.inner.token.cancel();
        self.inner.finish()
    }

    /// Whether `on_ready` ran and `on_unbind` did not yet.
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().phase == Phase::Ready
    }
}
