//! # Cancellation gate of one delivery attempt.
//!
//! [`ReceiverState`] is created once per delivery attempt and handed to every
//! receiver invocation of that attempt. It holds a three-valued flag:
//!
//! ```text
//!              try_set_cancellable(false)
//! CANCELLABLE ◄──────────────────────────► NOT_CANCELLABLE
//!      │        try_set_cancellable(true)        │
//!      │ try_cancel()                            │ (sealed on completion)
//!      ▼                                         ▼
//!   CANCELED ◄──────────────────────────────────-┘
//! ```
//!
//! ## Rules
//! - `CANCELED` is terminal; exactly one caller wins the transition into it.
//! - Only `try_cancel` from `CANCELLABLE` cancels the attempt's token
//!   (supersession). Sealing after a completed invocation does not.
//! - The attempt token is a child of the queue's disposal token, so disposal
//!   cancels the attempt regardless of the flag.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

const CANCELLABLE: u8 = 0;
const NOT_CANCELLABLE: u8 = 1;
const CANCELED: u8 = 2;

struct Gate {
    flag: AtomicU8,
    token: CancellationToken,
}

/// Cancellation state shared by all invocations of one delivery attempt.
///
/// Cheap to clone; all clones observe the same flag.
///
/// # Example
/// ```
/// use handover::ReceiverState;
/// use tokio_util::sync::CancellationToken;
///
/// let state = ReceiverState::new(CancellationToken::new());
/// assert!(state.try_set_cancellable(false));
/// assert!(!state.try_cancel()); // inside the critical window
/// assert!(state.try_set_cancellable(true));
/// assert!(state.try_cancel());
/// assert!(!state.try_set_cancellable(true));
/// ```
#[derive(Clone)]
pub struct ReceiverState {
    gate: Arc<Gate>,
}

impl ReceiverState {
    /// Creates a gate in `CANCELLABLE` guarding the given attempt token.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            gate: Arc::new(Gate {
                flag: AtomicU8::new(CANCELLABLE),
                token,
            }),
        }
    }

    /// Attempts `CANCELLABLE → CANCELED` and cancels the attempt on success.
    ///
    /// Returns whether this call performed the transition.
    pub fn try_cancel(&self) -> bool {
        let won = self
            .gate
            .flag
            .compare_exchange(CANCELLABLE, CANCELED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.gate.token.cancel();
        }
        won
    }

    /// Toggles `CANCELLABLE ↔ NOT_CANCELLABLE`.
    ///
    /// Returns `false` once the gate is `CANCELED`, regardless of `cancellable`.
    pub fn try_set_cancellable(&self, cancellable: bool) -> bool {
        let next = if cancellable {
            CANCELLABLE
        } else {
            NOT_CANCELLABLE
        };
        self.gate
            .flag
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != CANCELED).then_some(next)
            })
            .is_ok()
    }

    /// Moves the gate to `CANCELED` without canceling the attempt.
    ///
    /// Called after a receiver invocation completed, so that a racing
    /// supersession fails instead of reporting a delivered item as dropped.
    pub(crate) fn seal(&self) -> bool {
        self.gate.flag.swap(CANCELED, Ordering::AcqRel) != CANCELED
    }

    /// Whether the gate reached `CANCELED` (by cancellation or completion).
    pub fn is_canceled(&self) -> bool {
        self.gate.flag.load(Ordering::Acquire) == CANCELED
    }

    /// Whether a supersession would currently succeed.
    pub fn is_cancellable(&self) -> bool {
        self.gate.flag.load(Ordering::Acquire) == CANCELLABLE
    }

    /// Token canceled on supersession or queue disposal.
    pub fn token(&self) -> &CancellationToken {
        &self.gate.token
    }
}

impl std::fmt::Debug for ReceiverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = match self.gate.flag.load(Ordering::Acquire) {
            CANCELLABLE => "cancellable",
            NOT_CANCELLABLE => "not_cancellable",
            _ => "canceled",
        };
        f.debug_struct("ReceiverState")
            .field("flag", &flag)
            .field("token_cancelled", &self.gate.token.is_cancelled())
            .finish()
    }
}
