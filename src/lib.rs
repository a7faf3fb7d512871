//! # handover
//!
//! **Handover** delivers items from a long-lived producer to short-lived,
//! frequently recreated consumers without losing them in between.
//!
//! A consumer host (a screen, a window, a client session) may be destroyed
//! and recreated at any time. Items posted while no host is attached wait in
//! a per-identity queue; the next host attached through the same
//! [`RetainedId`] receives them. An item whose handling was interrupted by a
//! host change is retried against the new host instead of being lost.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!      ┌──────────────────────────────────────────────────────────────┐
//!      │  Owner (long-lived producer)                                 │
//!      │  - Bus (broadcast events)                                    │
//!      │  - SubscriberSet (fans out to user subscribers)              │
//!      │  - channel table: Signal<T>, Survey<Q, A>, ...               │
//!      └──────┬──────────────────────────────┬────────────────────────┘
//!             │ post / ask                   │ bind(id, host, mode, handler)
//!             ▼                              ▼
//!      ┌──────────────────────┐      ┌──────────────────────┐
//!      │  QueueRegistry       │◄─────│  LifecycleBinder     │
//!      │  RetainedId → queue  │      │  ready → attach      │
//!      └──────┬───────────────┘      │  destroy → detach    │
//!             │                      └──────────────────────┘
//!             ▼
//!      ┌──────────────────────────────────────────────────────────────┐
//!      │  DeliveryQueue                                               │
//!      │  ItemBuffer ──► consumer loop ──► attempt (one task / item)  │
//!      │                                       │                      │
//!      │            receiver slot (watch) ─────┘ hot swap, retry      │
//!      └──────┬───────────────────────────────────────────────────────┘
//!             │ publishes Events
//!             ▼
//!      Bus ──► subscriber_listener ──► SubscriberSet ──► sub.on_event()
//! ```
//!
//! ### Delivery attempt
//! ```text
//! item popped ──► [Latest] try_cancel(previous attempt)
//!             ──► ReceiverState::new(dispose.child_token())
//!             ──► loop {
//!                   ├─ no receiver      ─► wait for the slot (or cancellation)
//!                   ├─ receiver set     ─► invoke receiver(state, item)
//!                   │     ├─ returned   ─► Delivered (gate sealed), exit
//!                   │     ├─ panicked   ─► ReceiverPanicked, item dropped, exit
//!                   │     └─ slot moved ─► Abandoned, retry the same item
//!                   └─ token cancelled  ─► Superseded / Discarded, exit
//!                 }
//! ```
//!
//! ## Features
//! | Area               | Description                                                  | Key types / traits                        |
//! |--------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Channels**       | One-way and request/response channels owned by a producer.   | [`Owner`], [`Signal`], [`Survey`]         |
//! | **Queues**         | Per-identity buffer with hot-swappable receiver.             | [`DeliveryQueue`], [`QueueRegistry`]      |
//! | **Cancellation**   | Per-attempt gate with a non-cancellable window.              | [`ReceiverState`]                         |
//! | **Lifecycle**      | Host lifecycle, retained identities, binders.                | [`Lifecycle`], [`RetainedId`]             |
//! | **Subscriber API** | Hook into delivery events (logging, metrics, custom).        | [`Subscribe`], [`Event`]                  |
//! | **Errors**         | Typed errors for misuse and teardown.                        | [`DeliveryError`]                         |
//! | **Configuration**  | Owner-wide settings and per-queue mode.                      | [`Config`], [`DeliveryMode`]              |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use handover::{Config, DeliveryMode, Lifecycle, LifecycleState, Owner, RetainedId};
//! use parking_lot::Mutex;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), handover::DeliveryError> {
//!     let owner = Owner::new(Config::default());
//!     let toasts = owner.signal::<String>();
//!     let id = RetainedId::new();
//!     let seen = Arc::new(Mutex::new(Vec::new()));
//!
//!     // First host: created but never started, then destroyed.
//!     let first = Lifecycle::new();
//!     first.move_to(LifecycleState::Created);
//!     toasts.bind(&id, &first, DeliveryMode::All, |_| unreachable!());
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!
//!     owner.post(&toasts, "saved".to_string())?;
//!     first.destroy();
//!
//!     // Recreated host, same identity: the item is handed over.
//!     let second = Lifecycle::new();
//!     let sink = seen.clone();
//!     toasts.bind(&id, &second, DeliveryMode::All, move |s| sink.lock().push(s));
//!     second.move_to(LifecycleState::Started);
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!
//!     assert_eq!(*seen.lock(), vec!["saved".to_string()]);
//!     owner.clear();
//!     Ok(())
//! }
//! ```
mod channels;
mod config;
mod core;
mod error;
mod events;
mod lifecycle;
mod receivers;
mod subscribers;

// ---- Public re-exports ----

pub use channels::{Answers, Owner, OwnerBuilder, Questionnaire, Signal, Survey};
pub use config::{Config, DeliveryMode, QueueParams};
pub use core::{DeliveryQueue, QueueRegistry, ReceiverState};
pub use error::DeliveryError;
pub use events::{Bus, Event, EventKind};
pub use lifecycle::{Lifecycle, LifecycleBinder, LifecycleState, RetainedId};
pub use receivers::{BoxReceiveFuture, Receiver, ReceiverFn, ReceiverRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

// Keeps the README usage snippet compiled and run by `cargo test --doc`.
#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
