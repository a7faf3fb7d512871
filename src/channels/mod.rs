//! # Channels: the public producer/consumer surface.
//!
//! - [`Owner`], [`OwnerBuilder`]: long-lived producer and its channel table
//! - [`Signal`]: one-way items, consumed by a handler per host
//! - [`Survey`], [`Questionnaire`], [`Answers`]: request/response on top of
//!   the same delivery queues

mod bindings;
mod builder;
mod delivery;
mod owner;
mod signal;
mod survey;

pub use builder::OwnerBuilder;
pub use owner::Owner;
pub use signal::Signal;
pub use survey::{Answers, Questionnaire, Survey};
