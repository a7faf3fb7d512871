//! # LogWriter: event printer
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//! Normal flow goes to `debug!`, anything that loses an item or misbehaves
//! goes to `warn!`.
//!
//! ## Example output
//! ```text
//! DEBUG [queue-created] queue="signal#1/id2" mode="latest"
//! DEBUG [pushed] queue="signal#1/id2" item=1
//! DEBUG [abandoned] queue="signal#1/id2" item=1
//! DEBUG [delivered] queue="signal#1/id2" item=1
//!  WARN [superseded] queue="signal#1/id2" item=2
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let queue = e.queue.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::QueueCreated => {
                debug!(queue, mode = ?e.reason, "[queue-created]");
            }
            EventKind::QueueDisposed => debug!(queue, "[queue-disposed]"),
            EventKind::ReceiverAttached => debug!(queue, "[attached]"),
            EventKind::ReceiverDetached => debug!(queue, "[detached]"),
            EventKind::ItemPushed => debug!(queue, item = ?e.item, "[pushed]"),
            EventKind::AttemptStarted => debug!(queue, item = ?e.item, "[attempt]"),
            EventKind::AttemptAbandoned => debug!(queue, item = ?e.item, "[abandoned]"),
            EventKind::AttemptDelivered => debug!(queue, item = ?e.item, "[delivered]"),
            EventKind::OwnerCleared => debug!(owner = ?e.reason, "[owner-cleared]"),
            EventKind::ItemEvicted => warn!(queue, item = ?e.item, "[evicted]"),
            EventKind::PushRejected => warn!(queue, "[push-rejected]"),
            EventKind::AttemptSuperseded => warn!(queue, item = ?e.item, "[superseded]"),
            EventKind::AttemptDiscarded => warn!(queue, item = ?e.item, "[discarded]"),
            EventKind::ReceiverPanicked => {
                warn!(queue, item = ?e.item, info = ?e.reason, "[receiver-panicked]");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = queue, reason = ?e.reason, "[subscriber-overflow]");
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = queue, info = ?e.reason, "[subscriber-panicked]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
