//! # Subscription Registry
//!
//! Topic-keyed fan-out of JSON payloads to consumer callbacks.
//!
//! ```text
//!    publish(topic, data)
//!        │                  (Arc-clone per subscriber, snapshot of the list)
//!        ├──────────► [queue S1] ─► worker S1 ─► callback(&data)
//!        ├──────────► [queue S2] ─► worker S2 ─► callback(&data)
//!        └──────────► [queue SN] ─► worker SN ─► callback(&data)
//! ```
//!
//! ## Guarantees
//! - `publish` and `subscribe` never block and never await network state.
//! - Per-subscriber FIFO; subscribers of a topic are enqueued in subscription order.
//! - A callback returning `Err` or panicking is logged with topic and subscription
//!   id. Siblings still get the payload and the failing subscriber stays subscribed.
//! - Callbacks run on the blocking pool, one at a time per subscriber. A callback
//!   that blocks holds back its own queue and nothing else.
//! - `subscribe`, `publish` and `unsubscribe` may be called from inside a callback
//!   and from threads outside the runtime.
//!
//! ## Non-guarantees
//! - No ordering across subscribers.
//! - A full subscriber queue drops the payload for that subscriber only.
//! - `unsubscribe` stops future publishes; payloads already queued are still delivered.

pub mod error;
pub mod topic;

pub use error::*;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Consumer callback. Returning `Err` is logged as a [`CallbackError`].
pub type Callback = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Arc<Value>>,
}

struct Inner {
    topics: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    runtime: Handle,
}

impl Inner {
    fn topics(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        // Callbacks never run under this lock, so a poisoned map is still consistent.
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, topic: &str, id: u64) -> bool {
        let mut topics = self.topics();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            topics.remove(topic);
            debug!(topic, "Topic removed");
        }
        removed
    }
}

/// Cloneable handle to one registry. Clones share the same subscriptions.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

impl SubscriptionRegistry {
    /// Creates a registry whose workers run on the current Tokio runtime.
    ///
    /// Must be called within a Tokio runtime; use [`SubscriptionRegistry::with_handle`]
    /// otherwise.
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_handle(queue_capacity, Handle::current())
    }

    pub fn with_handle(queue_capacity: usize, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                runtime,
            }),
        }
    }

    /// Registers `callback` for `topic` and spawns its worker.
    ///
    /// Callable from any thread, inside or outside the runtime.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.queue_capacity);

        self.inner
            .runtime
            .spawn(deliver(topic.clone(), id, receiver, Arc::new(callback)));

        let mut topics = self.inner.topics();
        let subscribers = topics.entry(topic.clone()).or_default();
        subscribers.push(Subscriber { id, sender });
        debug!(%topic, id, subscribers = subscribers.len(), "Subscribed");
        drop(topics);

        Subscription {
            topic,
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Enqueues `data` for every current subscriber of `topic`.
    ///
    /// Returns how many subscribers accepted it. No subscribers is a no-op.
    pub fn publish(&self, topic: &str, data: Value) -> usize {
        // Snapshot so callbacks can (un)subscribe while we fan out.
        let snapshot: Vec<(u64, mpsc::Sender<Arc<Value>>)> = match self.inner.topics().get(topic) {
            Some(subscribers) => subscribers.iter().map(|s| (s.id, s.sender.clone())).collect(),
            None => return 0,
        };

        let data = Arc::new(data);
        let mut delivered = 0;
        for (id, sender) in snapshot {
            match sender.try_send(Arc::clone(&data)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(topic, id, "Subscriber dropped event: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(topic, id, "Subscriber dropped event: worker closed");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.topics().get(topic).map_or(0, Vec::len)
    }

    /// Topics that currently have at least one subscriber, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.topics().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Drops every subscription. Workers finish what is already queued, then exit.
    pub fn clear(&self) {
        let mut topics = self.inner.topics();
        let count: usize = topics.values().map(Vec::len).sum();
        topics.clear();
        debug!(count, "Registry cleared");
    }
}

async fn deliver(topic: String, id: u64, mut receiver: mpsc::Receiver<Arc<Value>>, callback: Callback) {
    while let Some(data) = receiver.recv().await {
        // Awaited before the next item: per-subscriber FIFO.
        let call = Arc::clone(&callback);
        let result = tokio::task::spawn_blocking(move || call(data.as_ref())).await;
        let failure = match result {
            Ok(Ok(())) => continue,
            Ok(Err(reason)) => CallbackError::Failed { topic: topic.clone(), id, reason },
            Err(join) if join.is_panic() => CallbackError::Panicked {
                topic: topic.clone(),
                id,
                message: panic_message(join.into_panic().as_ref()),
            },
            Err(_) => {
                debug!(%topic, id, "Subscriber callback cancelled, runtime shutting down");
                break;
            }
        };
        error!(%topic, id, error = %failure, "Subscriber callback failed");
    }
    debug!(%topic, id, "Subscriber worker stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle returned by [`SubscriptionRegistry::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: String,
    id: u64,
    registry: Weak<Inner>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops future deliveries. Idempotent; a no-op once the registry is gone.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            if inner.remove(&self.topic, self.id) {
                debug!(topic = %self.topic, id = self.id, "Unsubscribed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn forward(tx: mpsc::UnboundedSender<Value>) -> impl Fn(&Value) -> Result<(), String> + Send + Sync {
        move |data| {
            let _ = tx.send(data.clone());
            Ok(())
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("channel closed")
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_of_topic_only() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();
        let _a = registry.subscribe("order_o1", forward(tx));
        let _b = registry.subscribe("order_o2", forward(other_tx));

        assert_eq!(registry.publish("order_o1", json!({"status": "ready"})), 1);
        assert_eq!(next(&mut rx).await, json!({"status": "ready"}));
        settle().await;
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_before_publish_means_zero_invocations() {
        let registry = SubscriptionRegistry::new(8);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = registry.subscribe("t", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(registry.publish("t", json!(1)), 0);
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let registry = SubscriptionRegistry::new(8);
        assert_eq!(registry.publish("nobody", json!({})), 0);
        assert!(registry.topics().is_empty());
    }

    #[tokio::test]
    async fn test_topic_removed_with_last_subscriber() {
        let registry = SubscriptionRegistry::new(8);
        let a = registry.subscribe("t", |_| Ok(()));
        let b = registry.subscribe("t", |_| Ok(()));
        assert_eq!(registry.subscriber_count("t"), 2);

        a.unsubscribe();
        assert_eq!(registry.topics(), vec!["t".to_string()]);
        b.unsubscribe();
        assert!(registry.topics().is_empty());
        assert_eq!(registry.subscriber_count("t"), 0);
    }

    #[tokio::test]
    async fn test_failing_and_panicking_subscribers_are_isolated() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let errors = Arc::new(AtomicUsize::new(0));
        let panics = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&errors);
        let _err = registry.subscribe("t", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err("boom".to_string())
        });
        let seen = Arc::clone(&panics);
        let _panic = registry.subscribe("t", move |_| -> Result<(), String> {
            seen.fetch_add(1, Ordering::SeqCst);
            panic!("kaboom")
        });
        let _ok = registry.subscribe("t", forward(tx));

        assert_eq!(registry.publish("t", json!(1)), 3);
        assert_eq!(next(&mut rx).await, json!(1));

        // The failing subscribers are still registered and keep receiving.
        assert_eq!(registry.subscriber_count("t"), 3);
        assert_eq!(registry.publish("t", json!(2)), 3);
        assert_eq!(next(&mut rx).await, json!(2));

        for _ in 0..100 {
            if errors.load(Ordering::SeqCst) == 2 && panics.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert_eq!(panics.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_subscribe_from_thread_outside_runtime() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let remote = registry.clone();
        let sub = std::thread::spawn(move || remote.subscribe("order_o1", forward(tx)))
            .join()
            .expect("subscribe panicked off the runtime");

        assert_eq!(sub.topic(), "order_o1");
        assert_eq!(registry.publish("order_o1", json!("placed")), 1);
        assert_eq!(next(&mut rx).await, json!("placed"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_callback_stalls_only_its_own_topic() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _stuck = registry.subscribe("a", |_| {
            std::thread::sleep(Duration::from_secs(2));
            Ok(())
        });
        let _other = registry.subscribe("b", forward(tx));

        registry.publish("a", json!("slow"));
        settle().await;
        let started = std::time::Instant::now();
        registry.publish("b", json!("fast"));

        assert_eq!(next(&mut rx).await, json!("fast"));
        assert!(started.elapsed() < Duration::from_millis(500), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_callback_may_unsubscribe_itself() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let handle = Arc::clone(&slot);

        let sub = registry.subscribe("t", move |data| {
            if let Some(sub) = handle.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
            let _ = tx.send(data.clone());
            Ok(())
        });
        *slot.lock().unwrap() = Some(sub);

        registry.publish("t", json!("first"));
        assert_eq!(next(&mut rx).await, json!("first"));
        assert_eq!(registry.publish("t", json!("second")), 0);
    }

    #[tokio::test]
    async fn test_callback_may_publish_and_subscribe() {
        let registry = SubscriptionRegistry::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sink = registry.subscribe("echo", forward(tx));

        let inner = registry.clone();
        let _relay = registry.subscribe("t", move |data| {
            let _late = inner.subscribe("late", |_| Ok(()));
            inner.publish("echo", data.clone());
            Ok(())
        });

        registry.publish("t", json!("hi"));
        assert_eq!(next(&mut rx).await, json!("hi"));
        assert_eq!(registry.subscriber_count("late"), 1);
    }

    #[tokio::test]
    async fn test_per_subscriber_order_is_preserved() {
        let registry = SubscriptionRegistry::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = registry.subscribe("t", forward(tx));

        for i in 0..10 {
            registry.publish("t", json!(i));
        }
        for i in 0..10 {
            assert_eq!(next(&mut rx).await, json!(i));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_for_that_subscriber_only() {
        let registry = SubscriptionRegistry::new(1);
        let _slow = registry.subscribe("t", |_| Ok(()));
        let _fast = registry.subscribe("t", |_| Ok(()));

        // Workers have not run yet on the current-thread runtime, so the
        // second publish finds both single-slot queues full.
        assert_eq!(registry.publish("t", json!(1)), 2);
        assert_eq!(registry.publish("t", json!(2)), 0);
        assert_eq!(registry.subscriber_count("t"), 2);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let registry = SubscriptionRegistry::new(8);
        let sub = registry.subscribe("a", |_| Ok(()));
        let _b = registry.subscribe("b", |_| Ok(()));
        registry.clear();
        assert!(registry.topics().is_empty());
        sub.unsubscribe();
    }
}
