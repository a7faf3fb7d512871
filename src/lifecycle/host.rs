//! # Host lifecycle.
//!
//! [`Lifecycle`] models the transient consumer host (a screen, a window, a
//! client session). Its state is observable through `tokio::sync::watch`, so
//! any number of tasks can wait for a transition without polling.
//!
//! ```text
//! Initialized ─► Created ─► Started ─► Resumed
//!      │            ▲  │        ▲  │       │
//!      │            │  ▼        │  ▼       │
//!      └────────────┴─────── Destroyed ◄───┘   (terminal)
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Lifecycle states, ordered so that "at least `Started`" is a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Terminal state.
    Destroyed,
    /// Constructed, not yet created.
    Initialized,
    /// Created but not visible.
    Created,
    /// Visible.
    Started,
    /// Visible and focused.
    Resumed,
}

struct Inner {
    key: u64,
    tx: watch::Sender<LifecycleState>,
}

/// Observable host lifecycle. Clones share the same host.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    /// Creates a host in [`LifecycleState::Initialized`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Initialized);
        Self {
            inner: Arc::new(Inner {
                key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
                tx,
            }),
        }
    }

    /// Process-unique key of this host.
    pub fn key(&self) -> u64 {
        self.inner.key
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.inner.tx.borrow()
    }

    /// Moves the host to `state`. Ignored once destroyed.
    ///
    /// Returns whether the state changed.
    pub fn move_to(&self, state: LifecycleState) -> bool {
        self.inner.tx.send_if_modified(|cur| {
            if *cur == LifecycleState::Destroyed || *cur == state {
                return false;
            }
            *cur = state;
            true
        })
    }

    /// Shorthand for `move_to(LifecycleState::Destroyed)`.
    pub fn destroy(&self) -> bool {
        self.move_to(LifecycleState::Destroyed)
    }

    /// Whether the host is at least in `state` (and not destroyed).
    pub fn is_at_least(&self, state: LifecycleState) -> bool {
        self.state() >= state
    }

    /// Waits until the host is at least in `state`.
    ///
    /// Returns `false` if the host got destroyed first.
    pub async fn wait_at_least(&self, state: LifecycleState) -> bool {
        let mut rx = self.inner.tx.subscribe();
        let seen = rx
            .wait_for(|s| *s >= state || *s == LifecycleState::Destroyed)
            .await
            .map(|s| *s);
        matches!(seen, Ok(s) if s >= state && s != LifecycleState::Destroyed)
    }

    /// Waits until the host is destroyed.
    pub async fn destroyed(&self) {
        let mut rx = self.inner.tx.subscribe();
        let _ = rx.wait_for(|s| *s == LifecycleState::Destroyed).await;
    }

    /// Runs `fut` once the host is at least started.
    ///
    /// Returns `None` if the host is destroyed before or while `fut` runs.
    pub async fn when_started<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        if !self.wait_at_least(LifecycleState::Started).await {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.destroyed() => None,
            out = fut => Some(out),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("key", &self.inner.key)
            .field("state", &self.state())
            .finish()
    }
}
