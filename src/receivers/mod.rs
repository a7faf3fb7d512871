//! # Receiver abstractions.
//!
//! - [`Receiver`] - trait for the consumer side of a delivery queue
//! - [`ReceiverFn`] - closure-backed receiver
//! - [`ReceiverRef`] - shared reference to a receiver (`Arc<dyn Receiver<T>>`)

mod receiver;
mod receiver_fn;

pub use receiver::{BoxReceiveFuture, Receiver, ReceiverRef};
pub(crate) use receiver::same_receiver;
pub use receiver_fn::ReceiverFn;
