//! # Runtime events emitted by queues, registries and owners.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Queue lifecycle**: creation, disposal, receiver attach/detach
//! - **Buffer events**: pushes, evictions, rejected pushes
//! - **Attempt events**: the outcome of one delivery attempt
//! - **Subscriber events**: fan-out overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! queue label, the per-queue item number and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use handover::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::AttemptSuperseded)
//!     .with_queue("signal#1/id4")
//!     .with_item(3);
//!
//! assert_eq!(ev.kind, EventKind::AttemptSuperseded);
//! assert_eq!(ev.queue.as_deref(), Some("signal#1/id4"));
//! assert_eq!(ev.item, Some(3));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Queue lifecycle ===
    /// A queue was created for an identity and its dispatch loop started.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `reason`: delivery mode (`all` / `latest`)
    QueueCreated,

    /// A queue was disposed (identity invalidated or owner cleared).
    ///
    /// Sets:
    /// - `queue`: queue label
    QueueDisposed,

    /// A receiver became the current one.
    ///
    /// Sets:
    /// - `queue`: queue label
    ReceiverAttached,

    /// The receiver slot was cleared.
    ///
    /// Sets:
    /// - `queue`: queue label
    ReceiverDetached,

    // === Buffer events ===
    /// An item was accepted into the buffer.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    ItemPushed,

    /// A buffered, never-observed item was evicted by a newer one (`Latest` only).
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: number of the evicted item
    ItemEvicted,

    /// A push arrived after disposal and was ignored.
    ///
    /// Sets:
    /// - `queue`: queue label
    PushRejected,

    // === Attempt events ===
    /// A delivery attempt started for an item.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    AttemptStarted,

    /// A receiver invocation ran to completion; the item is consumed.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    AttemptDelivered,

    /// A newer item canceled this attempt (`Latest` only); the item is dropped.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    AttemptSuperseded,

    /// The receiver was replaced mid-invocation; the item is retried.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    AttemptAbandoned,

    /// The queue was disposed while the attempt was pending.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    AttemptDiscarded,

    /// A receiver panicked; the item is dropped.
    ///
    /// Sets:
    /// - `queue`: queue label
    /// - `item`: item number
    /// - `reason`: panic message
    ReceiverPanicked,

    // === Owner events ===
    /// The owner was cleared and tore down all of its channels.
    ///
    /// Sets:
    /// - `reason`: owner label
    OwnerCleared,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `queue`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `queue`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Label of the queue (or subscriber) the event concerns.
    pub queue: Option<Arc<str>>,
    /// Per-queue item number (starting from 1).
    pub item: Option<u64>,
    /// Human-readable reason (panic info, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            queue: None,
            item: None,
            reason: None,
        }
    }

    /// Attaches a queue label.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches an item number.
    #[inline]
    pub fn with_item(mut self, item: u64) -> Self {
        self.item = Some(item);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Helper: subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_queue(subscriber)
            .with_reason(reason)
    }

    /// Helper: subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_queue(subscriber)
            .with_reason(info)
    }

    /// Whether this event reports an attempt outcome.
    #[inline]
    pub fn is_attempt_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::AttemptDelivered
                | EventKind::AttemptSuperseded
                | EventKind::AttemptDiscarded
                | EventKind::ReceiverPanicked
        )
    }
}
