//! # Receiver abstraction.
//!
//! A [`Receiver`] consumes one item per invocation. Invocations are driven by
//! the dispatch engine and may be dropped at any await point: when a newer
//! item supersedes the attempt, when another receiver takes over, or when the
//! queue is disposed. A receiver that needs an uninterruptible section calls
//! [`ReceiverState::try_set_cancellable(false)`](ReceiverState::try_set_cancellable)
//! before entering it; only supersession honors that window.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::ReceiverState;

/// Boxed future returned by [`Receiver::receive`].
pub type BoxReceiveFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Consumer of queue items.
///
/// Each invocation gets its own clone of the item, because an invocation
/// abandoned on receiver replacement is retried with the same item against
/// the new receiver. Returning normally marks the item as delivered.
pub trait Receiver<T>: Send + Sync + 'static {
    /// Creates the future of one invocation.
    fn receive(&self, state: ReceiverState, item: T) -> BoxReceiveFuture;
}

/// Shared handle to a receiver.
pub type ReceiverRef<T> = Arc<dyn Receiver<T>>;

/// Identity comparison of two receiver handles (data pointer only).
pub(crate) fn same_receiver<T>(a: &ReceiverRef<T>, b: &ReceiverRef<T>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
