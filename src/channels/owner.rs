//! # Owner: the long-lived producer side.
//!
//! The [`Owner`] owns the event bus, a [`SubscriberSet`] and an explicit table
//! of every channel it created. Hosts come and go; the owner outlives them and
//! keeps their queues alive through [`RetainedId`](crate::RetainedId)s.
//!
//! ## Architecture
//! ```text
//! Owner::builder(cfg).with_subscribers(subs).build()
//!     ├─► Bus::new(cfg.bus_capacity)
//!     ├─► SubscriberSet::new(subs, bus)
//!     └─► subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit_arc
//!
//! owner.signal::<T>()         ──► Delivery { registry, bindings } ──► channel table
//! owner.post(&signal, item)   ──► registry.push_all(item)
//! owner.ask(&survey, q)       ──► registry.push_all(Questionnaire) ──► Answers
//! owner.clear()               ──► channel table drained once
//!                                   └─► per channel: unbind_all + dispose_all
//!                                   └─► publish OwnerCleared
//! ```
//!
//! ## Rules
//! - Posting through a channel created by another owner, or after `clear`,
//!   fails with [`DeliveryError::IllegalUsage`].
//! - `clear` is idempotent; dropping the last `Arc<Owner>` clears it too.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;

use super::builder::OwnerBuilder;
use super::delivery::{Delivery, Teardown};
use super::signal::Signal;
use super::survey::{Answers, Questionnaire, Survey};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Producer that creates channels and posts to them.
pub struct Owner {
    key: u64,
    label: Arc<str>,
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    channels: Mutex<Option<Vec<Arc<dyn Teardown>>>>,
    next_channel: AtomicU64,
    runtime_token: CancellationToken,
}

impl Owner {
    /// Returns a builder for an owner with the given config.
    pub fn builder(cfg: Config) -> OwnerBuilder {
        OwnerBuilder::new(cfg)
    }

    /// Creates an owner without subscribers.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    pub(crate) fn new_internal(
        cfg: Config,
        label: Option<String>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        let key = NEXT_OWNER.fetch_add(1, Ordering::Relaxed);
        let label: Arc<str> = match label {
            Some(label) => label.into(),
            None => format!("owner#{key}").into(),
        };
        Self {
            key,
            label,
            cfg,
            bus,
            subs,
            channels: Mutex::new(Some(Vec::new())),
            next_channel: AtomicU64::new(1),
            runtime_token: CancellationToken::new(),
        }
    }

    /// Owner label, prefix of every channel label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Owner configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared by every queue of this owner.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Creates a one-way channel registered with this owner.
    pub fn signal<T>(&self) -> Signal<T>
    where
        T: Clone + Send + 'static,
    {
        Signal {
            delivery: self.register("signal"),
        }
    }

    /// Creates a request/response channel registered with this owner.
    pub fn survey<Q, A>(&self) -> Survey<Q, A>
    where
        Q: Clone + Send + 'static,
        A: Send + 'static,
    {
        Survey {
            delivery: self.register("survey"),
        }
    }

    /// Pushes `item` to every live queue of `signal`.
    ///
    /// Returns how many queues received it; with no queue the item is dropped.
    ///
    /// # Errors
    /// [`DeliveryError::IllegalUsage`] if `signal` belongs to another owner
    /// or this owner was cleared.
    pub fn post<T>(&self, signal: &Signal<T>, item: T) -> Result<usize, DeliveryError>
    where
        T: Clone + Send + 'static,
    {
        self.check(&signal.delivery)?;
        Ok(signal.delivery.registry.push_all(item))
    }

    /// Asks `question` to every host bound to `survey`.
    ///
    /// The returned stream yields one answer per host that replied and ends
    /// once every copy of the question was delivered or discarded.
    ///
    /// # Errors
    /// Same as [`post`](Self::post).
    pub fn ask<Q, A>(&self, survey: &Survey<Q, A>, question: Q) -> Result<Answers<A>, DeliveryError>
    where
        Q: Clone + Send + 'static,
        A: Send + 'static,
    {
        self.check(&survey.delivery)?;
        let (tx, rx) = mpsc::unbounded_channel();
        survey
            .delivery
            .registry
            .push_all(Questionnaire::new(question, tx));
        Ok(Answers::new(rx))
    }

    /// Tears down every channel of this owner.
    ///
    /// Returns `true` only for the call that performed the teardown.
    pub fn clear(&self) -> bool {
        let Some(channels) = self.channels.lock().take() else {
            return false;
        };
        for channel in &channels {
            channel.teardown();
        }
        self.bus.publish(Event::new(EventKind::OwnerCleared).with_reason(Arc::clone(&self.label)));
        true
    }

    /// Whether [`clear`](Self::clear) ran.
    pub fn is_cleared(&self) -> bool {
        self.channels.lock().is_none()
    }

    /// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
    pub(crate) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                let ev = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        // Teardown events published right before cancellation.
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit_arc(Arc::new(ev)),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                    ev = rx.recv() => ev,
                };
                match ev {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn register<T>(&self, kind: &str) -> Arc<Delivery<T>>
    where
        T: Clone + Send + 'static,
    {
        let n = self.next_channel.fetch_add(1, Ordering::Relaxed);
        let label: Arc<str> = format!("{}/{kind}#{n}", self.label).into();
        let delivery = Delivery::new(label, self.key, self.cfg.clone(), self.bus.clone());

        let registered = match self.channels.lock().as_mut() {
            Some(table) => {
                table.push(Arc::clone(&delivery) as Arc<dyn Teardown>);
                true
            }
            None => false,
        };
        if !registered {
            // A cleared owner hands out dead channels.
            delivery.teardown();
        }
        delivery
    }

    fn check<T>(&self, delivery: &Delivery<T>) -> Result<(), DeliveryError> {
        if delivery.owner_key != self.key || self.is_cleared() {
            return Err(DeliveryError::IllegalUsage {
                channel: delivery.label.to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.clear();
        self.runtime_token.cancel();
    }
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("label", &self.label)
            .field("cleared", &self.is_cleared())
            .field("subscribers", &self.subs.len())
            .finish()
    }
}
