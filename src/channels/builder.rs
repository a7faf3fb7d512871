use std::sync::Arc;

use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::owner::Owner;

/// Builder for constructing an [`Owner`] with optional subscribers.
pub struct OwnerBuilder {
    cfg: Config,
    label: Option<String>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OwnerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            label: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the owner label used as prefix of channel and queue labels.
    ///
    /// Defaults to `owner#<n>`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive delivery events (queue lifecycle, attempt
    /// outcomes, etc.) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the owner.
    ///
    /// Spawns one worker per subscriber plus the bus listener, so it must be
    /// called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> Arc<Owner> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let owner = Arc::new(Owner::new_internal(self.cfg, self.label, bus, subs));
        owner.subscriber_listener();
        owner
    }
}
