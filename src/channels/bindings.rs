//! # Host bindings of one channel.
//!
//! Tracks, per host [`Lifecycle`], the [`LifecycleBinder`] that attaches the
//! channel's receiver for that host to the queue of its [`RetainedId`].
//!
//! ## Replace flow
//! ```text
//! bind(id, host, receiver)
//!   ├─► queue(id)?.detach()                 (old handler stops receiving)
//!   ├─► table.remove(host)?.unbind()        (outside the table lock)
//!   ├─► table.insert(host, new binder)
//!   └─► binder.bind_to(host)
//!          ├─ ready  → registry.get_or_create(id).attach(receiver)
//!          └─ unbind → queue(id)?.detach_if_current(receiver); table.remove_if(host, binding)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::QueueParams;
use crate::core::QueueRegistry;
use crate::lifecycle::{Lifecycle, LifecycleBinder, RetainedId};
use crate::receivers::ReceiverRef;

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

/// Host key → (binding number, binder).
pub(crate) struct Bindings {
    table: Mutex<HashMap<u64, (u64, LifecycleBinder)>>,
}

impl Bindings {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(HashMap::new()),
        })
    }

    /// Replaces the receiver of `lifecycle` and binds it to the queue of `id`.
    pub(crate) fn replace<T>(
        self: &Arc<Self>,
        registry: &Arc<QueueRegistry<T>>,
        id: &RetainedId,
        lifecycle: &Lifecycle,
        params: QueueParams,
        receiver: ReceiverRef<T>,
    ) where
        T: Clone + Send + 'static,
    {
        if let Some(queue) = registry.get(id.key()) {
            queue.detach();
        }
        self.unbind(lifecycle.key());

        let host = lifecycle.key();
        let binding = NEXT_BINDING.fetch_add(1, Ordering::Relaxed);

        let on_ready = {
            let registry = Arc::clone(registry);
            let id = id.clone();
            let receiver = Arc::clone(&receiver);
            move || {
                // A dead identity or a torn-down channel has nothing to attach to.
                if let Ok(queue) = registry.get_or_create(&id, params) {
                    queue.attach(receiver);
                }
            }
        };
        let on_unbind = {
            let registry: Weak<QueueRegistry<T>> = Arc::downgrade(registry);
            let bindings: Weak<Self> = Arc::downgrade(self);
            let key = id.key();
            move || {
                if let Some(queue) = registry.upgrade().and_then(|r| r.get(key)) {
                    queue.detach_if_current(&receiver);
                }
                if let Some(bindings) = bindings.upgrade() {
                    bindings.remove_if(host, binding);
                }
            }
        };

        let binder = LifecycleBinder::new(on_ready, on_unbind);
        self.table.lock().insert(host, (binding, binder.clone()));
        binder.bind_to(lifecycle);
    }

    /// Unbinds the binder of a host, if any.
    pub(crate) fn unbind(&self, host: u64) -> bool {
        let old = self.table.lock().remove(&host);
        match old {
            Some((_, binder)) => {
                binder.unbind();
                true
            }
            None => false,
        }
    }

    /// Unbinds every host.
    pub(crate) fn unbind_all(&self) {
        let drained: Vec<(u64, LifecycleBinder)> =
            self.table.lock().drain().map(|(_, b)| b).collect();
        for (_, binder) in drained {
            binder.unbind();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().len()
    }

    fn remove_if(&self, host: u64, binding: u64) {
        let mut table = self.table.lock();
        if table.get(&host).is_some_and(|(b, _)| *b == binding) {
            table.remove(&host);
        }
    }
}
