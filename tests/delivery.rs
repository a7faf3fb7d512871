//! Queue-level delivery guarantees and one-way channel scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handover::{
    Bus, Config, DeliveryError, DeliveryMode, DeliveryQueue, Event, EventKind, Lifecycle,
    LifecycleState, Owner, QueueParams, ReceiverFn, ReceiverRef, ReceiverState, RetainedId,
    Subscribe,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const SETTLE: Duration = Duration::from_millis(20);

fn stringify(tx: mpsc::UnboundedSender<String>) -> ReceiverRef<u32> {
    ReceiverFn::arc(move |_s: ReceiverState, n: u32| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(n.to_string());
        }
    })
}

async fn recv_n(rx: &mut mpsc::UnboundedReceiver<String>, n: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(n);
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
async fn all_mode_example_scenario() {
    let q = DeliveryQueue::new("example", QueueParams::all(), Bus::default());
    q.run_consumer_loop();
    for n in [1234, 5678, 9012] {
        q.push(n);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    q.attach(stringify(tx));
    let mut got = recv_n(&mut rx, 3).await;
    got.sort();
    assert_eq!(got, ["1234", "5678", "9012"]);
    sleep(SETTLE).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn latest_mode_example_scenario() {
    let q = DeliveryQueue::new("example", QueueParams::latest(1), Bus::default());
    q.run_consumer_loop();
    q.push(1234);
    q.push(5678);

    let (tx, mut rx) = mpsc::unbounded_channel();
    sleep(SETTLE).await;
    q.attach(stringify(tx));
    assert_eq!(recv_n(&mut rx, 1).await, ["5678"]);
    sleep(SETTLE).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn receiver_swaps_never_deliver_twice_or_lose_items() {
    const ITEMS: u32 = 40;
    let q = DeliveryQueue::new("swaps", QueueParams::all(), Bus::default());
    q.run_consumer_loop();

    let completions: Arc<Mutex<HashMap<u32, usize>>> = Arc::default();
    let slow = |completions: Arc<Mutex<HashMap<u32, usize>>>| -> ReceiverRef<u32> {
        ReceiverFn::arc(move |_s: ReceiverState, n: u32| {
            let completions = completions.clone();
            async move {
                sleep(Duration::from_millis(3)).await;
                *completions.lock().entry(n).or_default() += 1;
            }
        })
    };

    for n in 0..ITEMS {
        q.push(n);
    }
    for _ in 0..15 {
        q.attach(slow(completions.clone()));
        sleep(Duration::from_millis(1)).await;
        q.detach();
    }
    q.attach(slow(completions.clone()));

    timeout(Duration::from_secs(2), async {
        while completions.lock().len() < ITEMS as usize {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every item must eventually be delivered");
    sleep(SETTLE).await;

    let completions = completions.lock();
    assert!(completions.values().all(|&c| c == 1), "{completions:?}");
}

#[tokio::test]
async fn disposed_queue_delivers_nothing() {
    let q = DeliveryQueue::new("disposed", QueueParams::all(), Bus::default());
    q.run_consumer_loop();
    assert!(q.dispose());

    let (tx, mut rx) = mpsc::unbounded_channel();
    q.attach(stringify(tx));
    q.push(1);
    assert!(matches!(q.try_push(2), Err(DeliveryError::Disposed { .. })));
    assert!(!q.has_receiver());
    sleep(SETTLE).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn signal_waits_for_started_host() {
    let owner = Owner::new(Config::default());
    let signal = owner.signal::<u32>();
    let id = RetainedId::new();
    let host = Lifecycle::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    signal.bind(&id, &host, DeliveryMode::All, move |n| sink.lock().push(n));
    host.move_to(LifecycleState::Created);
    sleep(SETTLE).await;

    assert_eq!(owner.post(&signal, 1).unwrap(), 1);
    assert_eq!(owner.post(&signal, 2).unwrap(), 1);
    sleep(SETTLE).await;
    assert!(seen.lock().is_empty());

    host.move_to(LifecycleState::Started);
    sleep(SETTLE).await;
    let mut got = seen.lock().clone();
    got.sort();
    assert_eq!(got, [1, 2]);
}

#[tokio::test]
async fn signal_survives_host_recreation() {
    let owner = Owner::new(Config::default());
    let signal = owner.signal::<&'static str>();
    let id = RetainedId::new();
    let first_calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Lifecycle::new();
    first.move_to(LifecycleState::Created);
    let calls = first_calls.clone();
    signal.bind(&id, &first, DeliveryMode::All, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
    });
    sleep(SETTLE).await;
    owner.post(&signal, "hello").unwrap();
    sleep(SETTLE).await;
    first.destroy();

    let second = Lifecycle::new();
    let sink = seen.clone();
    signal.bind(&id, &second, DeliveryMode::All, move |s| sink.lock().push(s));
    second.move_to(LifecycleState::Started);
    sleep(SETTLE).await;

    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*seen.lock(), ["hello"]);
    assert_eq!(signal.binding_count(), 1);
}

#[tokio::test]
async fn post_without_queue_is_dropped_and_invalidation_disposes() {
    let owner = Owner::new(Config::default());
    let signal = owner.signal::<u32>();
    assert_eq!(owner.post(&signal, 1).unwrap(), 0);

    let id = RetainedId::new();
    let host = Lifecycle::new();
    host.move_to(LifecycleState::Started);
    signal.bind(&id, &host, DeliveryMode::All, |_| {});
    sleep(SETTLE).await;
    assert_eq!(signal.queue_count(), 1);

    assert!(id.invalidate());
    assert_eq!(signal.queue_count(), 0);
    assert_eq!(owner.post(&signal, 2).unwrap(), 0);
}

#[tokio::test]
async fn rebinding_same_host_replaces_handler() {
    let owner = Owner::new(Config::default());
    let signal = owner.signal::<u32>();
    let id = RetainedId::new();
    let host = Lifecycle::new();
    host.move_to(LifecycleState::Started);

    let old = Arc::new(AtomicUsize::new(0));
    let new = Arc::new(AtomicUsize::new(0));
    let o = old.clone();
    signal.bind(&id, &host, DeliveryMode::All, move |_| {
        o.fetch_add(1, Ordering::SeqCst);
    });
    sleep(SETTLE).await;
    let n = new.clone();
    signal.bind(&id, &host, DeliveryMode::All, move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    });
    sleep(SETTLE).await;

    owner.post(&signal, 1).unwrap();
    sleep(SETTLE).await;
    assert_eq!(old.load(Ordering::SeqCst), 0);
    assert_eq!(new.load(Ordering::SeqCst), 1);
    assert_eq!(signal.binding_count(), 1);

    assert!(signal.unbind(&host));
    assert!(!signal.unbind(&host));
}

#[derive(Default)]
struct Kinds(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().push(ev.kind);
    }
    fn name(&self) -> &'static str {
        "kinds"
    }
}

#[tokio::test]
async fn subscribers_observe_delivery_events() {
    let kinds = Arc::new(Kinds::default());
    let owner = Owner::builder(Config::default())
        .with_label("settings")
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build();
    let signal = owner.signal::<u32>();
    assert!(signal.name().starts_with("settings/signal#"));

    let id = RetainedId::new();
    let host = Lifecycle::new();
    host.move_to(LifecycleState::Started);
    signal.bind(&id, &host, DeliveryMode::Latest, |_| {});
    sleep(SETTLE).await;
    owner.post(&signal, 1).unwrap();
    sleep(SETTLE).await;
    owner.clear();
    sleep(SETTLE).await;

    let kinds = kinds.0.lock();
    for expected in [
        EventKind::QueueCreated,
        EventKind::ReceiverAttached,
        EventKind::ItemPushed,
        EventKind::AttemptStarted,
        EventKind::AttemptDelivered,
        EventKind::QueueDisposed,
        EventKind::OwnerCleared,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
}

#[tokio::test]
async fn post_right_after_binding_a_started_host_is_delivered() {
    let owner = Owner::new(Config::default());
    let signal = owner.signal::<u32>();
    let id = RetainedId::new();
    let host = Lifecycle::new();
    host.move_to(LifecycleState::Started);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    signal.bind(&id, &host, DeliveryMode::All, move |n| sink.lock().push(n));
    assert_eq!(signal.queue_count(), 1);
    assert_eq!(owner.post(&signal, 42).unwrap(), 1);

    sleep(SETTLE).await;
    assert_eq!(*seen.lock(), [42]);
}

#[tokio::test]
async fn dropping_the_owner_reports_teardown_to_subscribers() {
    let kinds = Arc::new(Kinds::default());
    let owner = Owner::builder(Config::default())
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build();
    let signal = owner.signal::<u32>();
    let id = RetainedId::new();
    let host = Lifecycle::new();
    host.move_to(LifecycleState::Started);
    signal.bind(&id, &host, DeliveryMode::All, |_| {});
    sleep(SETTLE).await;

    drop(signal);
    drop(owner);
    sleep(SETTLE).await;

    let kinds = kinds.0.lock();
    assert!(kinds.contains(&EventKind::QueueDisposed), "{kinds:?}");
    assert!(kinds.contains(&EventKind::OwnerCleared), "{kinds:?}");
}
