//! # DeliveryQueue: item buffer plus hot-swappable receiver slot.
//!
//! One queue serves one identity. It owns:
//! - an [`ItemBuffer`] (FIFO, bounded only under `Latest`),
//! - a receiver slot (`tokio::sync::watch`, so writers never wait on readers
//!   and attempts can await replacements),
//! - a disposal [`CancellationToken`], parent of every attempt token,
//! - exactly one dispatch loop, started by [`DeliveryQueue::run_consumer_loop`].
//!
//! ## Rules
//! - `push` / `set_receiver` never block and never fail; after disposal they
//!   are no-ops.
//! - `dispose` is terminal and idempotent.
//! - Dropping the last handle without calling `dispose` stops the loop and
//!   every attempt as well (the disposal token is cancelled by a drop guard).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::QueueParams;
use crate::core::buffer::{ItemBuffer, PushOutcome};
use crate::core::dispatch;
use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};
use crate::receivers::{same_receiver, ReceiverRef};

/// State shared between queue handles, the dispatch loop and its attempts.
pub(crate) struct Shared<T> {
    pub(crate) name: Arc<str>,
    pub(crate) params: QueueParams,
    pub(crate) buffer: ItemBuffer<T>,
    pub(crate) slot: watch::Sender<Option<ReceiverRef<T>>>,
    pub(crate) dispose: CancellationToken,
    pub(crate) bus: Bus,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl<T> Shared<T> {
    pub(crate) fn publish(&self, kind: EventKind, item: Option<u64>) {
        let mut ev = Event::new(kind).with_queue(Arc::clone(&self.name));
        if let Some(item) = item {
            ev = ev.with_item(item);
        }
        self.bus.publish(ev);
    }
}

/// Delivery queue handle. Cheap to clone; all clones address the same queue.
pub struct DeliveryQueue<T> {
    shared: Arc<Shared<T>>,
    _guard: Arc<DropGuard>,
}

impl<T> Clone for DeliveryQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _guard: Arc::clone(&self._guard),
        }
    }
}

impl<T> DeliveryQueue<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a queue. Nothing is delivered until [`run_consumer_loop`](Self::run_consumer_loop).
    pub fn new(name: impl Into<Arc<str>>, params: QueueParams, bus: Bus) -> Self {
        let dispose = CancellationToken::new();
        let guard = dispose.clone().drop_guard();
        let (slot, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                params,
                buffer: ItemBuffer::new(params.buffer_capacity()),
                slot,
                dispose,
                bus,
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
            _guard: Arc::new(guard),
        }
    }

    /// Queue label used in events.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Construction parameters.
    pub fn params(&self) -> QueueParams {
        self.shared.params
    }

    /// Enqueues an item. Silently ignored after disposal.
    pub fn push(&self, item: T) {
        let _ = self.try_push(item);
    }

    /// Enqueues an item and returns its per-queue number.
    ///
    /// Fails with [`DeliveryError::Disposed`] after disposal.
    pub fn try_push(&self, item: T) -> Result<u64, DeliveryError> {
        if self.shared.dispose.is_cancelled() {
            self.shared.publish(EventKind::PushRejected, None);
            return Err(self.disposed_error());
        }
        match self.shared.buffer.push(item) {
            PushOutcome::Accepted { item } => {
                self.shared.publish(EventKind::ItemPushed, Some(item));
                Ok(item)
            }
            PushOutcome::Evicted { item, evicted } => {
                self.shared.publish(EventKind::ItemEvicted, Some(evicted));
                self.shared.publish(EventKind::ItemPushed, Some(item));
                Ok(item)
            }
            PushOutcome::Closed => {
                self.shared.publish(EventKind::PushRejected, None);
                Err(self.disposed_error())
            }
        }
    }

    /// Atomically replaces the current receiver (`None` detaches).
    ///
    /// Attempts waiting for a receiver pick up the new one; an invocation in
    /// progress against the old one is abandoned and retried.
    pub fn set_receiver(&self, receiver: Option<ReceiverRef<T>>) {
        let kind = if receiver.is_some() {
            EventKind::ReceiverAttached
        } else {
            EventKind::ReceiverDetached
        };
        // Checked under the slot lock: `dispose` cancels before it clears the slot.
        let dispose = &self.shared.dispose;
        let replaced = self.shared.slot.send_if_modified(|cur| {
            if dispose.is_cancelled() {
                return false;
            }
            *cur = receiver;
            true
        });
        if replaced {
            self.shared.publish(kind, None);
        }
    }

    /// Shorthand for `set_receiver(Some(receiver))`.
    pub fn attach(&self, receiver: ReceiverRef<T>) {
        self.set_receiver(Some(receiver));
    }

    /// Shorthand for `set_receiver(None)`.
    pub fn detach(&self) {
        self.set_receiver(None);
    }

    /// Detaches only if `receiver` is still the current one.
    ///
    /// Returns whether the slot was cleared.
    pub fn detach_if_current(&self, receiver: &ReceiverRef<T>) -> bool {
        if self.shared.dispose.is_cancelled() {
            return false;
        }
        let cleared = self.shared.slot.send_if_modified(|cur| {
            let is_current = matches!(cur, Some(r) if same_receiver(r, receiver));
            if is_current {
                *cur = None;
            }
            is_current
        });
        if cleared {
            self.shared.publish(EventKind::ReceiverDetached, None);
        }
        cleared
    }

    /// Whether a receiver is currently attached.
    pub fn has_receiver(&self) -> bool {
        self.shared.slot.borrow().is_some()
    }

    /// Starts the dispatch loop on the current tokio runtime.
    ///
    /// Returns `false` if the loop was already started or the queue is disposed;
    /// a queue never runs two loops.
    pub fn run_consumer_loop(&self) -> bool {
        if self.shared.dispose.is_cancelled() || self.shared.started.swap(true, Ordering::AcqRel)
        {
            return false;
        }
        tokio::spawn(dispatch::consumer_loop(Arc::clone(&self.shared)));
        true
    }

    /// Tears the queue down: cancels the loop and every attempt, drops the
    /// buffered items and the receiver.
    ///
    /// Returns `true` only for the call that performed the disposal.
    pub fn dispose(&self) -> bool {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.dispose.cancel();
        self.shared.buffer.close();
        self.shared.slot.send_replace(None);
        self.shared.publish(EventKind::QueueDisposed, None);
        true
    }

    /// Whether the queue no longer accepts items.
    pub fn is_disposed(&self) -> bool {
        self.shared.dispose.is_cancelled()
    }

    /// Number of items buffered but not yet pulled by the dispatch loop.
    pub fn pending(&self) -> usize {
        self.shared.buffer.len()
    }

    fn disposed_error(&self) -> DeliveryError {
        DeliveryError::Disposed {
            queue: self.shared.name.to_string(),
        }
    }
}

impl<T> std::fmt::Debug for DeliveryQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("name", &self.shared.name)
            .field("mode", &self.shared.params.mode)
            .field("disposed", &self.shared.dispose.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivers::ReceiverFn;
    use crate::ReceiverState;

    #[test]
    fn attach_racing_dispose_leaves_slot_empty() {
        for _ in 0..32 {
            let q = DeliveryQueue::<u32>::new("race", QueueParams::all(), Bus::default());
            let r: ReceiverRef<u32> = ReceiverFn::arc(|_s: ReceiverState, _n: u32| async {});
            std::thread::scope(|s| {
                for _ in 0..4 {
                    let (q, r) = (q.clone(), r.clone());
                    s.spawn(move || {
                        for _ in 0..200 {
                            q.attach(Arc::clone(&r));
                        }
                    });
                }
                q.dispose();
            });
            assert!(q.is_disposed());
            assert!(!q.has_receiver());
            assert_eq!(Arc::strong_count(&r), 1);
        }
    }
}
