//! # Identity-scoped queue registry.
//!
//! Maps a [`RetainedId`] to its [`DeliveryQueue`]:
//! - `get_or_create` → creates, registers and starts a queue on first attach
//! - identity invalidated → `on_invalidated` removes and disposes the queue
//! - `dispose_all` → owner teardown, no further queues may be created
//!
//! ## Architecture
//! ```text
//! bind(id) ──► QueueRegistry.get_or_create(id)
//!                 ├─► hit  → existing queue
//!                 └─► miss → DeliveryQueue::new → run_consumer_loop
//!                            id.add_callback(on_invalidated)
//!
//! id.invalidate() ──► QueueRegistry.on_invalidated(key) ──► queue.dispose()
//! ```
//!
//! ## Rules
//! - All map access goes through one coarse lock; this is not a hot path.
//! - Queues are disposed **outside** the lock.
//! - The invalidation callback holds a `Weak` registry, so a dropped registry
//!   is never kept alive by the identities it served.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::QueueParams;
use crate::core::queue::DeliveryQueue;
use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::RetainedId;

struct Table<T> {
    queues: HashMap<u64, DeliveryQueue<T>>,
    closed: bool,
}

/// Registry of the queues of one channel, one per identity.
pub struct QueueRegistry<T> {
    name: Arc<str>,
    table: Mutex<Table<T>>,
    bus: Bus,
}

impl<T> QueueRegistry<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an empty registry.
    pub fn new(name: impl Into<Arc<str>>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            table: Mutex::new(Table {
                queues: HashMap::new(),
                closed: false,
            }),
            bus,
        })
    }

    /// Registry label (channel name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the queue of `id`, creating and starting it on first use.
    ///
    /// Concurrent first attaches through the same identity observe one queue.
    /// `params` only applies when the queue is created.
    ///
    /// # Errors
    /// - [`DeliveryError::IdentityInvalidated`] if `id` is already dead.
    /// - [`DeliveryError::Disposed`] after [`dispose_all`](Self::dispose_all).
    pub fn get_or_create(
        self: &Arc<Self>,
        id: &RetainedId,
        params: QueueParams,
    ) -> Result<DeliveryQueue<T>, DeliveryError> {
        let key = id.key();
        let mut table = self.table.lock();
        if table.closed {
            return Err(DeliveryError::Disposed {
                queue: self.name.to_string(),
            });
        }
        if let Some(queue) = table.queues.get(&key) {
            return Ok(queue.clone());
        }

        let registry: Weak<Self> = Arc::downgrade(self);
        let registered = id.add_callback(move |key| {
            if let Some(registry) = registry.upgrade() {
                registry.on_invalidated(key);
            }
        });
        if !registered {
            return Err(DeliveryError::IdentityInvalidated { id: key });
        }

        let queue = DeliveryQueue::new(format!("{}/id{}", self.name, key), params, self.bus.clone());
        queue.run_consumer_loop();
        table.queues.insert(key, queue.clone());
        drop(table);

        self.bus.publish(
            Event::new(EventKind::QueueCreated)
                .with_queue(queue.name())
                .with_reason(params.mode.as_str()),
        );
        Ok(queue)
    }

    /// Returns the queue of the identity `key`, if any.
    pub fn get(&self, key: u64) -> Option<DeliveryQueue<T>> {
        self.table.lock().queues.get(&key).cloned()
    }

    /// Removes and disposes the queue of an invalidated identity.
    ///
    /// Returns `false` if there was no queue (already removed).
    pub fn on_invalidated(&self, key: u64) -> bool {
        let removed = self.table.lock().queues.remove(&key);
        match removed {
            Some(queue) => {
                queue.dispose();
                true
            }
            None => false,
        }
    }

    /// Snapshot of all live queues.
    pub fn queues(&self) -> Vec<DeliveryQueue<T>> {
        self.table.lock().queues.values().cloned().collect()
    }

    /// Pushes `item` into every live queue; returns how many received it.
    pub fn push_all(&self, item: T) -> usize {
        let queues = self.queues();
        let mut reached = 0;
        for queue in queues {
            if queue.try_push(item.clone()).is_ok() {
                reached += 1;
            }
        }
        reached
    }

    /// Disposes every queue and refuses further creation.
    ///
    /// Returns `false` if the registry was already closed.
    pub fn dispose_all(&self) -> bool {
        let drained: Vec<DeliveryQueue<T>> = {
            let mut table = self.table.lock();
            if table.closed {
                return false;
            }
            table.closed = true;
            table.queues.drain().map(|(_, q)| q).collect()
        };
        for queue in drained {
            queue.dispose();
        }
        true
    }

    /// Number of live queues.
    pub fn len(&self) -> usize {
        self.table.lock().queues.len()
    }

    /// Whether there are no live queues.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
