//! # Identity token.
//!
//! A [`RetainedId`] outlives the hosts that attach through it (a screen
//! recreated after rotation keeps its id) and is invalidated exactly once,
//! either explicitly or when the last handle is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

type Callback = Box<dyn FnOnce(u64) + Send>;

struct Inner {
    key: u64,
    /// `None` once invalidated.
    callbacks: Mutex<Option<Vec<Callback>>>,
}

impl Inner {
    fn fire(&self) -> bool {
        let callbacks = self.callbacks.lock().take();
        match callbacks {
            Some(callbacks) => {
                for cb in callbacks {
                    cb(self.key);
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Identity token handle. Clones share the same identity.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use handover::RetainedId;
///
/// let id = RetainedId::new();
/// let fired = Arc::new(AtomicUsize::new(0));
/// let f = fired.clone();
/// assert!(id.add_callback(move |_key| { f.fetch_add(1, Ordering::SeqCst); }));
///
/// assert!(id.invalidate());
/// assert!(!id.invalidate());
/// assert_eq!(fired.load(Ordering::SeqCst), 1);
/// assert!(!id.add_callback(|_| {}));
/// ```
#[derive(Clone)]
pub struct RetainedId {
    inner: Arc<Inner>,
}

impl RetainedId {
    /// Creates a fresh, live identity.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
                callbacks: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// Process-unique key of this identity.
    pub fn key(&self) -> u64 {
        self.inner.key
    }

    /// Registers a callback fired once on invalidation.
    ///
    /// Returns `false` (and drops `cb`) if the identity is already invalidated.
    pub fn add_callback<F>(&self, cb: F) -> bool
    where
        F: FnOnce(u64) + Send + 'static,
    {
        match self.inner.callbacks.lock().as_mut() {
            Some(callbacks) => {
                callbacks.push(Box::new(cb));
                true
            }
            None => false,
        }
    }

    /// Invalidates the identity and fires every registered callback.
    ///
    /// Returns `true` only for the call that performed the invalidation.
    /// Callbacks run on the calling thread, outside any internal lock.
    pub fn invalidate(&self) -> bool {
        self.inner.fire()
    }

    /// Whether the identity is dead.
    pub fn is_invalidated(&self) -> bool {
        self.inner.callbacks.lock().is_none()
    }
}

impl Default for RetainedId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RetainedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainedId")
            .field("key", &self.inner.key)
            .field("invalidated", &self.is_invalidated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn last_drop_invalidates() {
        let fired = Arc::new(AtomicUsize::new(0));
        let id = RetainedId::new();
        let key = id.key();
        let f = fired.clone();
        id.add_callback(move |k| {
            assert_eq!(k, key);
            f.fetch_add(1, Ordering::SeqCst);
        });
        let clone = id.clone();
        drop(id);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        drop(clone);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keys_are_unique() {
        assert_ne!(RetainedId::new().key(), RetainedId::new().key());
    }
}
