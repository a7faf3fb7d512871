//! Delivery core: the cancellation gate, the queue and its dispatch engine,
//! and the identity-scoped registry.
//!
//! Internal modules:
//! - [`gate`]: three-state cancellation flag of one delivery attempt;
//! - [`buffer`]: FIFO item buffer with keep-newest overflow;
//! - [`queue`]: buffer plus hot-swappable receiver slot, lifecycle operations;
//! - [`dispatch`]: consumer loop and per-item attempts;
//! - [`registry`]: identity → queue map with invalidation-driven disposal.

mod buffer;
mod dispatch;
mod gate;
mod queue;
mod registry;

pub use gate::ReceiverState;
pub use queue::DeliveryQueue;
pub use registry::QueueRegistry;
