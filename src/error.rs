//! Error types surfaced to producers and lifecycle code.
//!
//! Cancellation-kind outcomes (supersession, abandonment, disposal) are never
//! errors: the dispatch engine handles them locally and reports them as
//! [`Event`](crate::Event)s. [`DeliveryError`] covers what is left, which is
//! illegal use of the API and lifecycle operations against dead resources.

use thiserror::Error;

/// # Errors produced by the delivery layer.
///
/// These are raised synchronously to the caller and indicate a usage bug
/// (wrong owner, dead identity) rather than a runtime race.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel was not registered with the owner it was used through,
    /// or the owner was already cleared.
    #[error("illegal usage of channel {channel}")]
    IllegalUsage {
        /// Label of the offending channel.
        channel: String,
    },

    /// The identity token was invalidated and can no longer be attached.
    #[error("identity {id} is invalidated")]
    IdentityInvalidated {
        /// Key of the dead identity.
        id: u64,
    },

    /// The queue was disposed and no longer accepts items.
    #[error("queue {queue} is disposed")]
    Disposed {
        /// Label of the disposed queue.
        queue: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use handover::DeliveryError;
    ///
    /// let err = DeliveryError::IdentityInvalidated { id: 7 };
    /// assert_eq!(err.as_label(), "delivery_identity_invalidated");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::IllegalUsage { .. } => "delivery_illegal_usage",
            DeliveryError::IdentityInvalidated { .. } => "delivery_identity_invalidated",
            DeliveryError::Disposed { .. } => "delivery_disposed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DeliveryError::IllegalUsage { channel } => {
                format!("channel {channel} is not registered with this owner")
            }
            DeliveryError::IdentityInvalidated { id } => format!("identity #{id} is gone"),
            DeliveryError::Disposed { queue } => format!("queue {queue} was torn down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let illegal = DeliveryError::IllegalUsage {
            channel: "signal#1".into(),
        };
        assert_eq!(illegal.as_label(), "delivery_illegal_usage");
        assert_eq!(illegal.to_string(), "illegal usage of channel signal#1");

        let disposed = DeliveryError::Disposed {
            queue: "signal#1/id3".into(),
        };
        assert_eq!(disposed.as_label(), "delivery_disposed");
        assert!(disposed.as_message().contains("signal#1/id3"));
    }
}
