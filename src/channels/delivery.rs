//! # Per-channel delivery state.
//!
//! A [`Delivery`] is what a channel handle (`Signal`, `Survey`) points to: the
//! channel label, the owner it belongs to, its queue registry and its host
//! bindings. The owner keeps every delivery in its channel table as a
//! [`Teardown`] so that clearing the owner disposes all queues exactly once.

use std::sync::Arc;

use crate::config::Config;
use crate::core::QueueRegistry;
use crate::events::Bus;

use super::bindings::Bindings;

/// Owner-side teardown hook of a channel.
pub(crate) trait Teardown: Send + Sync {
    fn teardown(&self);
}

pub(crate) struct Delivery<T> {
    pub(crate) label: Arc<str>,
    pub(crate) owner_key: u64,
    pub(crate) cfg: Config,
    pub(crate) registry: Arc<QueueRegistry<T>>,
    pub(crate) bindings: Arc<Bindings>,
}

impl<T> Delivery<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(label: Arc<str>, owner_key: u64, cfg: Config, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            registry: QueueRegistry::new(Arc::clone(&label), bus),
            label,
            owner_key,
            cfg,
            bindings: Bindings::new(),
        })
    }
}

impl<T> Teardown for Delivery<T>
where
    T: Clone + Send + 'static,
{
    fn teardown(&self) {
        self.bindings.unbind_all();
        self.registry.dispose_all();
    }
}
