mod backoff;
mod transmit;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use web_push::IsahcWebPushClient;

use crate::config::{DispatcherConfig, WebPushConfig};
use crate::store::{Subscription, SubscriptionStore};
use backoff::backoff;
use transmit::{Outcome, Transport};

/// Transient unit of dispatch work: an immutable subscription snapshot
/// paired with a shared payload handle, so store mutations after enqueue
/// never affect in-flight retries and identical payloads aren't copied
/// per task.
struct DispatchTask {
    subscription: Subscription,
    payload: Arc<[u8]>,
}

/// Bounded-concurrency, retry- and backoff-aware Web Push worker pool.
///
/// A fixed pool of `worker_count` workers drains a shared bounded queue
/// (`flume`, chosen over a `tokio::mpsc` + mutex-guarded receiver because
/// its receivers are natively cloneable for multi-consumer fan-out).
pub struct PushDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    tx: Mutex<Option<flume::Sender<DispatchTask>>>,
    rx: flume::Receiver<DispatchTask>,
    store: Arc<dyn SubscriptionStore>,
    web_push: WebPushConfig,
    worker_count: usize,
    max_retries: u32,
    base_backoff_ms: u64,
    workers: Mutex<Vec<JoinHandle<()>>>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
}

impl PushDispatcher {
    pub fn new(config: DispatcherConfig, web_push: WebPushConfig, store: Arc<dyn SubscriptionStore>) -> Self {
        Self::with_transport(config, web_push, store, None)
    }

    /// Same as `new`, but lets callers (tests) inject the transport instead
    /// of letting `start` build a live `IsahcWebPushClient`.
    fn with_transport(
        config: DispatcherConfig,
        web_push: WebPushConfig,
        store: Arc<dyn SubscriptionStore>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let (tx, rx) = flume::bounded(config.queue_size);
        Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Some(tx)),
                rx,
                store,
                web_push,
                worker_count: config.worker_count,
                max_retries: config.max_retries,
                base_backoff_ms: config.base_backoff_ms,
                workers: Mutex::new(Vec::new()),
                transport: Mutex::new(transport),
            }),
        }
    }

    /// Spawns the worker pool. Safe to call once at process startup.
    pub async fn start(&self) {
        let transport = {
            let mut slot = self.inner.transport.lock().await;
            if slot.is_none() {
                match IsahcWebPushClient::new() {
                    Ok(client) => *slot = Some(Arc::new(client) as Arc<dyn Transport>),
                    Err(err) => {
                        log::error!("dispatcher: failed to build web push client: {err}");
                        return;
                    }
                }
            }
            slot.clone().expect("transport populated above")
        };

        let mut workers = self.inner.workers.lock().await;
        for id in 0..self.inner.worker_count {
            let rx = self.inner.rx.clone();
            let store = self.inner.store.clone();
            let web_push = self.inner.web_push.clone();
            let max_retries = self.inner.max_retries;
            let base_backoff_ms = self.inner.base_backoff_ms;
            let transport = transport.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(id, rx, store, web_push, max_retries, base_backoff_ms, transport).await;
            }));
        }
    }

    /// Closes the queue and waits for in-flight workers to drain.
    pub async fn stop(&self) {
        self.inner.tx.lock().await.take();
        let mut workers = self.inner.workers.lock().await;
        for handle in workers.drain(..) {
            let _ = handle.await;
        }
    }

    /// Blocks only if the queue is full; non-blocking under normal load.
    pub async fn enqueue(&self, subscription: Subscription, payload: Arc<[u8]>) {
        let endpoint = subscription.endpoint.clone();
        // Clone the sender out from under the lock so an unrelated producer
        // on a free slot is never blocked behind this call's `send_async`.
        let tx = self.inner.tx.lock().await.clone();
        match tx {
            Some(tx) => {
                if tx.send_async(DispatchTask { subscription, payload }).await.is_err() {
                    log::error!("dispatcher queue unexpectedly closed, dropping task for {endpoint}");
                }
            }
            None => log::warn!("dispatcher stopped, dropping push task for {endpoint}"),
        }
    }

    /// Bulk enqueue preserving the same payload handle across every task.
    /// Callers that must not block the request path should run this on a
    /// background task.
    pub async fn enqueue_many(&self, subscriptions: Vec<Subscription>, payload: Arc<[u8]>) {
        for subscription in subscriptions {
            self.enqueue(subscription, payload.clone()).await;
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: flume::Receiver<DispatchTask>,
    store: Arc<dyn SubscriptionStore>,
    web_push: WebPushConfig,
    max_retries: u32,
    base_backoff_ms: u64,
    transport: Arc<dyn Transport>,
) {
    while let Ok(task) = rx.recv_async().await {
        if !web_push.is_complete() {
            log::warn!(
                "VAPID configuration incomplete; dropping push task for {}",
                task.subscription.endpoint
            );
            continue;
        }
        process_task(transport.as_ref(), store.as_ref(), &web_push, task, max_retries, base_backoff_ms).await;
    }
    log::debug!("dispatcher worker {id} exiting");
}

async fn process_task(
    transport: &dyn Transport,
    store: &dyn SubscriptionStore,
    web_push: &WebPushConfig,
    task: DispatchTask,
    max_retries: u32,
    base_backoff_ms: u64,
) {
    let DispatchTask { subscription, payload } = task;
    let total_attempts = max_retries + 1;

    for attempt in 0..total_attempts {
        match transport.send(&subscription, &payload, web_push).await {
            Outcome::Success => return,
            Outcome::Gone => {
                // The worker task is already decoupled from whatever HTTP
                // request caused the enqueue, so this await is already
                // running on a "fresh background context" in the sense
                // the spec cares about: nothing can cancel it out from
                // under the original caller.
                if let Err(err) = store.delete_by_endpoint(&subscription.endpoint).await {
                    log::error!("failed to prune gone subscription {}: {err}", subscription.endpoint);
                } else {
                    log::info!("pruned gone subscription {}", subscription.endpoint);
                }
                return;
            }
            Outcome::Retryable => {
                if attempt + 1 < total_attempts {
                    tokio::time::sleep(backoff(base_backoff_ms, attempt)).await;
                    continue;
                }
                log::warn!(
                    "giving up on {} after {total_attempts} attempts",
                    subscription.endpoint
                );
                return;
            }
            Outcome::Terminal => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl SubscriptionStore for CountingStore {
        async fn upsert(&self, _: &str, _: &str, _: &str, _: &[String]) -> Result<bool, StoreError> {
            Ok(true)
        }
        async fn delete_by_endpoint(&self, _: &str) -> Result<(), StoreError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get_topics(&self, _: &str) -> Result<Option<Vec<String>>, StoreError> {
            Ok(None)
        }
        async fn get_subscription(&self, _: &str) -> Result<Option<Subscription>, StoreError> {
            Ok(None)
        }
        async fn list_for_topic(&self, _: &str) -> Result<Vec<Subscription>, StoreError> {
            Ok(Vec::new())
        }
    }

    /// Returns a fixed `Outcome` for every send and counts how many times it ran.
    struct FakeTransport {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, _: &Subscription, _: &[u8], _: &WebPushConfig) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    fn fixture_subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            p256dh: "p".to_string(),
            auth: "a".to_string(),
            topics: vec!["default".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn complete_web_push_config() -> WebPushConfig {
        WebPushConfig {
            vapid_public_key: "pub".to_string(),
            vapid_private_key: "priv".to_string(),
            subject: String::new(),
            ttl_seconds: 60,
        }
    }

    #[tokio::test]
    async fn incomplete_vapid_config_drops_without_panicking() {
        let store: Arc<dyn SubscriptionStore> = Arc::new(CountingStore { deletes: AtomicUsize::new(0) });
        let dispatcher = PushDispatcher::new(
            DispatcherConfig {
                worker_count: 1,
                queue_size: 4,
                max_retries: 0,
                base_backoff_ms: 1,
            },
            WebPushConfig {
                vapid_public_key: String::new(),
                vapid_private_key: String::new(),
                subject: String::new(),
                ttl_seconds: 60,
            },
            store,
        );
        dispatcher.start().await;
        dispatcher
            .enqueue(fixture_subscription("https://example.com/1"), Arc::from(b"{}".as_slice()))
            .await;
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn stop_drains_queue_before_returning() {
        let store: Arc<dyn SubscriptionStore> = Arc::new(CountingStore { deletes: AtomicUsize::new(0) });
        let dispatcher = PushDispatcher::new(
            DispatcherConfig {
                worker_count: 2,
                queue_size: 16,
                max_retries: 0,
                base_backoff_ms: 1,
            },
            WebPushConfig {
                vapid_public_key: String::new(),
                vapid_private_key: String::new(),
                subject: String::new(),
                ttl_seconds: 60,
            },
            store,
        );
        dispatcher.start().await;
        for i in 0..5 {
            dispatcher
                .enqueue(fixture_subscription(&format!("https://example.com/{i}")), Arc::from(b"{}".as_slice()))
                .await;
        }
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn gone_outcome_prunes_subscription() {
        let store = Arc::new(CountingStore { deletes: AtomicUsize::new(0) });
        let store_dyn: Arc<dyn SubscriptionStore> = store.clone();
        let transport: Arc<dyn Transport> = Arc::new(FakeTransport { outcome: Outcome::Gone, calls: AtomicUsize::new(0) });

        let dispatcher = PushDispatcher::with_transport(
            DispatcherConfig { worker_count: 1, queue_size: 4, max_retries: 2, base_backoff_ms: 1 },
            complete_web_push_config(),
            store_dyn,
            Some(transport),
        );
        dispatcher.start().await;
        dispatcher
            .enqueue(fixture_subscription("https://example.com/gone"), Arc::from(b"{}".as_slice()))
            .await;
        dispatcher.stop().await;

        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_outcome_exhausts_attempts_without_pruning() {
        let store = Arc::new(CountingStore { deletes: AtomicUsize::new(0) });
        let store_dyn: Arc<dyn SubscriptionStore> = store.clone();
        let transport = Arc::new(FakeTransport { outcome: Outcome::Retryable, calls: AtomicUsize::new(0) });
        let transport_dyn: Arc<dyn Transport> = transport.clone();

        let dispatcher = PushDispatcher::with_transport(
            DispatcherConfig { worker_count: 1, queue_size: 4, max_retries: 2, base_backoff_ms: 1 },
            complete_web_push_config(),
            store_dyn,
            Some(transport_dyn),
        );
        dispatcher.start().await;
        dispatcher
            .enqueue(fixture_subscription("https://example.com/retry"), Arc::from(b"{}".as_slice()))
            .await;
        dispatcher.stop().await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }
}
