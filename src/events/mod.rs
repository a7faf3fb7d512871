//! Delivery events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `DeliveryQueue`, the dispatch engine's attempts,
//!   `QueueRegistry`, `Owner`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Owner::subscriber_listener()` (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
