//! # Async dispatch engine.
//!
//! The consumer loop pulls items from the buffer in push order and starts one
//! delivery attempt per item. Each attempt runs in its own task and is
//! addressed to "whatever the current receiver is" until one invocation
//! completes.
//!
//! ## Attempt state machine
//! ```text
//!            ┌────────────────────── slot changed (abandon, retry same item) ──┐
//!            ▼                                                                 │
//! Start ─► Waiting-for-receiver ──── receiver set ────► Invoking ──────────────┤
//!            │                                            │                    │
//!            │ token cancelled                            │ returned           │
//!            ▼                                            ▼                    │
//!   Superseded / Discarded                   Completed (gate sealed) ◄─────────┘
//! ```
//!
//! ## Rules
//! - `All`: attempt N+1 starts without waiting for attempt N; attempts race
//!   independently, so completions are unordered.
//! - `Latest`: starting attempt N+1 first calls `try_cancel` on attempt N, so
//!   at most one attempt stays active (unless N is inside its
//!   non-cancellable window, in which case it is allowed to finish).
//! - An old invocation is always dropped before the next one starts, so an
//!   item is never handed to two receivers at once.
//! - Completion seals the gate; a racing supersession then fails harmlessly.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::config::DeliveryMode;
use crate::core::gate::ReceiverState;
use crate::core::queue::Shared;
use crate::events::{Event, EventKind};
use crate::subscribers::panic_message;

/// How one attempt ended.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// An invocation ran to completion.
    Delivered,
    /// A newer item canceled the attempt.
    Superseded,
    /// The queue was disposed.
    Discarded,
    /// The receiver panicked.
    Panicked(String),
}

/// Drains the buffer until disposal, starting one attempt per item.
pub(crate) async fn consumer_loop<T>(shared: Arc<Shared<T>>)
where
    T: Clone + Send + 'static,
{
    let mut prev: Option<ReceiverState> = None;

    loop {
        let next = tokio::select! {
            biased;
            _ = shared.dispose.cancelled() => None,
            next = shared.buffer.pop() => next,
        };
        let Some((item_no, item)) = next else {
            break;
        };

        if shared.params.mode == DeliveryMode::Latest {
            if let Some(prev) = prev.take() {
                prev.try_cancel();
            }
        }

        let state = ReceiverState::new(shared.dispose.child_token());
        shared.publish(EventKind::AttemptStarted, Some(item_no));
        tokio::spawn(run_attempt(
            Arc::clone(&shared),
            state.clone(),
            item_no,
            item,
        ));

        if shared.params.mode == DeliveryMode::Latest {
            prev = Some(state);
        }
    }

    // Reached on disposal, or when the last queue handle was dropped.
    shared.buffer.close();
}

async fn run_attempt<T>(shared: Arc<Shared<T>>, state: ReceiverState, item_no: u64, item: T)
where
    T: Clone + Send + 'static,
{
    let outcome = deliver(&shared, &state, item_no, item).await;
    let ev = Event::new(match &outcome {
        Outcome::Delivered => EventKind::AttemptDelivered,
        Outcome::Superseded => EventKind::AttemptSuperseded,
        Outcome::Discarded => EventKind::AttemptDiscarded,
        Outcome::Panicked(_) => EventKind::ReceiverPanicked,
    })
    .with_queue(Arc::clone(&shared.name))
    .with_item(item_no);

    shared.bus.publish(match outcome {
        Outcome::Panicked(info) => ev.with_reason(info),
        _ => ev,
    });
}

/// Runs one attempt until an invocation completes or the attempt is canceled.
async fn deliver<T>(shared: &Shared<T>, state: &ReceiverState, item_no: u64, item: T) -> Outcome
where
    T: Clone + Send + 'static,
{
    let token = state.token().clone();
    let mut slot = shared.slot.subscribe();

    loop {
        let current = slot.borrow_and_update().clone();
        let receiver = match current {
            Some(receiver) => receiver,
            None => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return cancel_outcome(shared),
                    changed = slot.changed() => {
                        if changed.is_err() {
                            return Outcome::Discarded;
                        }
                    }
                }
                continue;
            }
        };

        let call = AssertUnwindSafe(receiver.receive(state.clone(), item.clone())).catch_unwind();
        tokio::select! {
            biased;
            _ = token.cancelled() => return cancel_outcome(shared),
            changed = slot.changed() => {
                if changed.is_err() {
                    return Outcome::Discarded;
                }
                shared.publish(EventKind::AttemptAbandoned, Some(item_no));
            }
            res = call => {
                state.seal();
                return match res {
                    Ok(()) => Outcome::Delivered,
                    Err(panic) => Outcome::Panicked(panic_message(&*panic)),
                };
            }
        }
    }
}

fn cancel_outcome<T>(shared: &Shared<T>) -> Outcome {
    if shared.dispose.is_cancelled() {
        Outcome::Discarded
    } else {
        Outcome::Superseded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::{mpsc, Notify};
    use tokio::time::{sleep, timeout};

    use crate::config::QueueParams;
    use crate::core::DeliveryQueue;
    use crate::events::Bus;
    use crate::receivers::{ReceiverFn, ReceiverRef};
    use crate::ReceiverState;

    fn collecting(tx: mpsc::UnboundedSender<String>) -> ReceiverRef<u32> {
        ReceiverFn::arc(move |_s: ReceiverState, n: u32| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(n.to_string());
            }
        })
    }

    async fn drain(rx: &mut mpsc::UnboundedReceiver<String>, n: usize) -> Vec<String> {
        let mut out = Vec::new();
        for _ in 0..n {
            let v = timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("delivery timed out")
                .expect("channel closed");
            out.push(v);
        }
        out
    }

    #[tokio::test]
    async fn all_mode_delivers_items_pushed_before_attach() {
        let q = DeliveryQueue::new("q", QueueParams::all(), Bus::default());
        q.run_consumer_loop();
        q.push(1234);
        q.push(5678);
        q.push(9012);

        let (tx, mut rx) = mpsc::unbounded_channel();
        sleep(Duration::from_millis(10)).await;
        q.attach(collecting(tx));

        let mut got = drain(&mut rx, 3).await;
        got.sort();
        assert_eq!(got, vec!["1234", "5678", "9012"]);
        sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err(), "no item may be delivered twice");
    }

    #[tokio::test]
    async fn latest_mode_keeps_only_the_newest() {
        let q = DeliveryQueue::new("q", QueueParams::latest(1), Bus::default());
        q.run_consumer_loop();
        q.push(1234);
        sleep(Duration::from_millis(10)).await;
        q.push(5678);
        sleep(Duration::from_millis(10)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        q.attach(collecting(tx));

        assert_eq!(drain(&mut rx, 1).await, vec!["5678"]);
        sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replaced_receiver_retries_the_same_item() {
        let q = DeliveryQueue::new("q", QueueParams::all(), Bus::default());
        q.run_consumer_loop();

        let started = Arc::new(Notify::new());
        let first_calls = Arc::new(AtomicUsize::new(0));
        let stuck: ReceiverRef<u32> = {
            let started = started.clone();
            let first_calls = first_calls.clone();
            ReceiverFn::arc(move |_s: ReceiverState, _n: u32| {
                let started = started.clone();
                first_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    started.notify_one();
                    std::future::pending::<()>().await;
                }
            })
        };
        q.attach(stuck);
        q.push(42);
        timeout(Duration::from_secs(1), started.notified())
            .await
            .unwrap();

        q.detach();
        sleep(Duration::from_millis(10)).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        q.attach(collecting(tx));

        assert_eq!(drain(&mut rx, 1).await, vec!["42"]);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_cancellable_window_survives_supersession() {
        let q = DeliveryQueue::new("q", QueueParams::latest(1), Bus::default());
        q.run_consumer_loop();

        let release = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let r: ReceiverRef<u32> = {
            let (release, entered, seen) = (release.clone(), entered.clone(), seen.clone());
            ReceiverFn::arc(move |s: ReceiverState, n: u32| {
                let (release, entered, seen) = (release.clone(), entered.clone(), seen.clone());
                async move {
                    if n == 1 {
                        assert!(s.try_set_cancellable(false));
                        entered.notify_one();
                        release.notified().await;
                    }
                    seen.lock().push(n);
                }
            })
        };
        q.attach(r);
        q.push(1);
        timeout(Duration::from_secs(1), entered.notified())
            .await
            .unwrap();
        q.push(2);
        sleep(Duration::from_millis(10)).await;
        release.notify_one();
        sleep(Duration::from_millis(20)).await;

        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn dispose_cancels_active_attempt_and_ignores_pushes() {
        let bus = Bus::default();
        let mut events = bus.subscribe();
        let q = DeliveryQueue::new("q", QueueParams::all(), bus);
        q.run_consumer_loop();

        let dropped = Arc::new(Notify::new());
        struct OnDrop(Arc<Notify>);
        impl Drop for OnDrop {
            fn drop(&mut self) {
                self.0.notify_one();
            }
        }
        let r: ReceiverRef<u32> = {
            let dropped = dropped.clone();
            ReceiverFn::arc(move |_s: ReceiverState, _n: u32| {
                let guard = OnDrop(dropped.clone());
                async move {
                    let _guard = guard;
                    std::future::pending::<()>().await;
                }
            })
        };
        q.attach(r);
        q.push(1);
        sleep(Duration::from_millis(10)).await;

        assert!(q.dispose());
        assert!(!q.dispose());
        timeout(Duration::from_secs(1), dropped.notified())
            .await
            .expect("active invocation must be dropped promptly");
        assert!(q.try_push(2).is_err());
        assert!(!q.run_consumer_loop());

        let mut discarded = false;
        while let Ok(Ok(ev)) = timeout(Duration::from_millis(50), events.recv()).await {
            if ev.kind == crate::EventKind::AttemptDiscarded {
                discarded = true;
            }
        }
        assert!(discarded);
    }

    #[tokio::test]
    async fn panicking_receiver_does_not_stop_the_loop() {
        let q = DeliveryQueue::new("q", QueueParams::all(), Bus::default());
        q.run_consumer_loop();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let r: ReceiverRef<u32> = ReceiverFn::arc(move |_s: ReceiverState, n: u32| {
            let tx = tx.clone();
            async move {
                if n == 0 {
                    panic!("zero");
                }
                let _ = tx.send(n.to_string());
            }
        });
        q.attach(r);
        q.push(0);
        q.push(7);
        assert_eq!(drain(&mut rx, 1).await, vec!["7"]);
    }
}
