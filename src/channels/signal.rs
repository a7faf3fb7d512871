//! # Signal: one-way items from an owner to its hosts.
//!
//! Created by [`Owner::signal`](crate::Owner::signal), posted to with
//! [`Owner::post`](crate::Owner::post), consumed by a handler bound per host.
//!
//! ## Handler semantics
//! The installed receiver waits until the host is started, then enters the
//! non-cancellable window and calls the handler. A host destroyed while an
//! item waits never consumes it: the invocation is parked until the binding
//! detaches it, and the item is retried against the next host attached
//! through the same [`RetainedId`].

use std::sync::Arc;

use crate::channels::delivery::Delivery;
use crate::config::DeliveryMode;
use crate::core::ReceiverState;
use crate::lifecycle::{Lifecycle, RetainedId};
use crate::receivers::{ReceiverFn, ReceiverRef};

/// Handle to a one-way channel. Cheap to clone.
pub struct Signal<T> {
    pub(crate) delivery: Arc<Delivery<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            delivery: Arc::clone(&self.delivery),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Channel label.
    pub fn name(&self) -> &str {
        &self.delivery.label
    }

    /// Installs `handler` for `lifecycle`, attached through `id`.
    ///
    /// Replaces any handler previously bound for the same host, and detaches
    /// whatever receiver the identity's queue had. The queue is created on
    /// first attach with `mode`; later binds reuse it as it is.
    pub fn bind<F>(&self, id: &RetainedId, lifecycle: &Lifecycle, mode: DeliveryMode, handler: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let receiver = handler_receiver(lifecycle.clone(), Arc::new(handler));
        self.delivery.bindings.replace(
            &self.delivery.registry,
            id,
            lifecycle,
            self.delivery.cfg.params(mode),
            receiver,
        );
    }

    /// Removes the handler bound for `lifecycle`.
    ///
    /// Returns `false` if none was bound.
    pub fn unbind(&self, lifecycle: &Lifecycle) -> bool {
        self.delivery.bindings.unbind(lifecycle.key())
    }

    /// Number of identities with a live queue.
    pub fn queue_count(&self) -> usize {
        self.delivery.registry.len()
    }

    /// Number of hosts with a binding.
    pub fn binding_count(&self) -> usize {
        self.delivery.bindings.len()
    }
}

/// Wraps `handler` into the receiver installed for `host`.
///
/// The invocation only returns once the handler ran. A superseded attempt or
/// a destroyed host parks it until the dispatch engine drops it.
fn handler_receiver<T, F>(host: Lifecycle, handler: Arc<F>) -> ReceiverRef<T>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    ReceiverFn::arc(move |state: ReceiverState, item: T| {
        let handler = Arc::clone(&handler);
        let host = host.clone();
        async move {
            let handled = host
                .when_started(async move {
                    if !state.try_set_cancellable(false) {
                        std::future::pending::<()>().await;
                    }
                    handler(item);
                })
                .await;
            if handled.is_none() {
                std::future::pending::<()>().await;
            }
        }
    })
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.delivery.label)
            .finish()
    }
}
