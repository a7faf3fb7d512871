//! # Function-backed receiver (`ReceiverFn`)
//!
//! [`ReceiverFn`] wraps a closure `F: Fn(ReceiverState, T) -> Fut`, producing a
//! fresh future per invocation.
//!
//! ## Example
//! ```rust
//! use handover::{ReceiverFn, ReceiverRef, ReceiverState};
//!
//! let r: ReceiverRef<u32> = ReceiverFn::arc(|_state: ReceiverState, n: u32| async move {
//!     println!("got {n}");
//! });
//! # drop(r);
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::core::ReceiverState;
use crate::receivers::receiver::{BoxReceiveFuture, Receiver};

/// Function-backed receiver implementation.
#[derive(Debug)]
pub struct ReceiverFn<F> {
    f: F,
}

impl<F> ReceiverFn<F> {
    /// Creates a new function-backed receiver.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the receiver and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<T, F, Fut> Receiver<T> for ReceiverFn<F>
where
    T: Send + 'static,
    F: Fn(ReceiverState, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn receive(&self, state: ReceiverState, item: T) -> BoxReceiveFuture {
        Box::pin((self.f)(state, item))
    }
}
