//! # Item buffer of a delivery queue.
//!
//! FIFO buffer between producers (`push`, never blocks) and the single
//! dispatch loop (`pop`, suspends while empty). Items are numbered under the
//! buffer lock, so numbers follow buffer order.
//!
//! ## Capacity
//! - `None`: unbounded (`DeliveryMode::All`)
//! - `Some(n)`: at most `n` items; a push into a full buffer evicts the oldest
//!   buffered item (keep-newest)

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Result of a push.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    /// Accepted as item `item`.
    Accepted { item: u64 },
    /// Accepted as item `item`; item `evicted` was dropped to make room.
    Evicted { item: u64, evicted: u64 },
    /// Buffer is closed.
    Closed,
}

struct BufferState<T> {
    items: VecDeque<(u64, T)>,
    capacity: Option<usize>,
    next_item: u64,
    closed: bool,
}

pub(crate) struct ItemBuffer<T> {
    state: Mutex<BufferState<T>>,
    notify: Notify,
}

impl<T> ItemBuffer<T> {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                capacity: capacity.map(|c| c.max(1)),
                next_item: 1,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    pub(crate) fn push(&self, value: T) -> PushOutcome {
        let (outcome, evicted) = {
            let mut st = self.state.lock();
            if st.closed {
                return PushOutcome::Closed;
            }
            let item = st.next_item;
            st.next_item += 1;

            let evicted = match st.capacity {
                Some(cap) if st.items.len() >= cap => st.items.pop_front(),
                _ => None,
            };
            st.items.push_back((item, value));

            let outcome = match &evicted {
                Some((old, _)) => PushOutcome::Evicted {
                    item,
                    evicted: *old,
                },
                None => PushOutcome::Accepted { item },
            };
            (outcome, evicted)
        };
        drop(evicted);
        // Single consumer: a stored permit wakes the next `pop` if nobody waits yet.
        self.notify.notify_one();
        outcome
    }

    /// Pops the oldest item, suspending while the buffer is empty.
    ///
    /// Returns `None` once the buffer is closed.
    pub(crate) async fn pop(&self) -> Option<(u64, T)> {
        loop {
            {
                let mut st = self.state.lock();
                if st.closed {
                    return None;
                }
                if let Some(entry) = st.items.pop_front() {
                    return Some(entry);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Closes the buffer and drops everything still buffered.
    ///
    /// Returns how many items were dropped.
    pub(crate) fn close(&self) -> usize {
        let dropped = {
            let mut st = self.state.lock();
            st.closed = true;
            std::mem::take(&mut st.items)
        };
        self.notify.notify_one();
        dropped.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_and_numbering() {
        let buf = ItemBuffer::new(None);
        assert_eq!(buf.push("a"), PushOutcome::Accepted { item: 1 });
        assert_eq!(buf.push("b"), PushOutcome::Accepted { item: 2 });
        assert_eq!(buf.pop().await, Some((1, "a")));
        assert_eq!(buf.pop().await, Some((2, "b")));
    }

    #[tokio::test]
    async fn bounded_keeps_newest() {
        let buf = ItemBuffer::new(Some(1));
        buf.push(1);
        assert_eq!(buf.push(2), PushOutcome::Evicted { item: 2, evicted: 1 });
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.pop().await, Some((2, 2)));
    }

    #[tokio::test]
    async fn pop_wakes_on_push_and_close() {
        let buf = std::sync::Arc::new(ItemBuffer::new(None));

        let b = buf.clone();
        let waiter = tokio::spawn(async move { b.pop().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        buf.push(7u32);
        assert_eq!(waiter.await.unwrap(), Some((1, 7)));

        let b = buf.clone();
        let waiter = tokio::spawn(async move { b.pop().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        buf.push(8);
        buf.push(9);
        assert_eq!(waiter.await.unwrap(), Some((2, 8)));
        assert_eq!(buf.close(), 1);
        assert_eq!(buf.pop().await, None);
        assert_eq!(buf.push(10), PushOutcome::Closed);
    }
}
