//! # Lifecycle collaborators.
//!
//! - [`RetainedId`]: identity token that survives transient detach/attach
//!   cycles and reports exactly one invalidation
//! - [`Lifecycle`], [`LifecycleState`]: observable host lifecycle
//! - [`LifecycleBinder`]: turns a host lifecycle into ready/unbind callbacks

mod binder;
mod host;
mod retained_id;

pub use binder::LifecycleBinder;
pub use host::{Lifecycle, LifecycleState};
pub use retained_id::RetainedId;
