//! Ingestion pipeline: decode, persist, cache, report.

use crate::bus::OrderSubscriber;
use crate::metrics::IngestMetrics;
use crate::outcome::{outcome_kind, IngestOutcome};
use ordercache_core::{Order, OrderError, OrderId, OrderResult};
use ordercache_repository::OrderRepository;
use ordercache_service::OrderCacheInterface;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Turns order event payloads into stored, cached orders.
///
/// Messages are handled one at a time. A failed message produces an error
/// outcome and nothing else; the next message is processed normally.
pub struct IngestionPipeline {
    repository: Arc<dyn OrderRepository>,
    cache: Arc<dyn OrderCacheInterface>,
    outcome_tx: mpsc::Sender<IngestOutcome>,
}

impl IngestionPipeline {
    /// Creates a pipeline and the receiving end of its outcome channel.
    ///
    /// `outcome_buffer` bounds how many outcomes may wait for the consumer;
    /// when full, message handling waits.
    #[must_use]
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        cache: Arc<dyn OrderCacheInterface>,
        outcome_buffer: usize,
    ) -> (Self, mpsc::Receiver<IngestOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(outcome_buffer.max(1));
        (
            Self {
                repository,
                cache,
                outcome_tx,
            },
            outcome_rx,
        )
    }

    /// Runs the four steps for one payload.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Decode`]: nothing was stored or cached.
    /// - [`OrderError::Persistence`]: the store rolled the aggregate back.
    /// - [`OrderError::IdResolution`]: the order may be durable but is not cached.
    pub async fn process(&self, payload: &[u8]) -> OrderResult<OrderId> {
        let order = Order::decode(payload)?;
        debug!(order_uid = %order.order_uid, items = order.item_count(), "Order decoded");

        let id = match self.repository.save(&order).await {
            Ok(id) => id,
            Err(e @ (OrderError::Persistence(_) | OrderError::IdResolution(_))) => return Err(e),
            Err(e) => return Err(OrderError::persistence(e.to_string())),
        };

        if !id.is_assigned() {
            return Err(OrderError::IdResolution(format!(
                "store returned id {} for order {}",
                id, order.order_uid
            )));
        }

        self.cache.set(id, order);
        Ok(id)
    }

    /// Processes one payload and reports the outcome on the channel.
    pub async fn handle_event(&self, payload: &[u8]) {
        let started = Instant::now();
        let outcome = self.process(payload).await;
        let kind = outcome_kind(&outcome);
        IngestMetrics::processed(kind, started.elapsed());

        match &outcome {
            Ok(id) => info!(order_id = %id, "Order ingested"),
            Err(e) => warn!(outcome = kind, error = %e, "Order event rejected"),
        }

        self.report(outcome).await;
    }

    async fn report(&self, outcome: IngestOutcome) {
        if self.outcome_tx.send(outcome).await.is_err() {
            debug!("Outcome receiver dropped");
        }
    }

    /// Consumes `subscriber` on a new task until it ends or the handle is
    /// closed.
    #[must_use]
    pub fn spawn(self, subscriber: Box<dyn OrderSubscriber>) -> PipelineHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(subscriber, shutdown_rx));

        PipelineHandle {
            shutdown_tx,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        }
    }

    async fn run(self, mut subscriber: Box<dyn OrderSubscriber>, mut shutdown_rx: broadcast::Receiver<()>) {
        let subject = subscriber.subject().to_string();
        info!(subject = %subject, "Ingestion pipeline started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(subject = %subject, "Ingestion pipeline received shutdown signal");
                    break;
                }

                payload = subscriber.next_payload() => {
                    let Some(payload) = payload else {
                        error!(subject = %subject, "Subscription ended");
                        self.report(Err(OrderError::bus(format!("Subscription to '{}' ended", subject))))
                            .await;
                        break;
                    };
                    IngestMetrics::received(&subject);
                    self.handle_event(&payload).await;
                }
            }
        }

        if let Err(e) = subscriber.close().await {
            warn!(subject = %subject, error = %e, "Failed to close subscription");
        }
        info!(subject = %subject, "Ingestion pipeline stopped");
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl PipelineHandle {
    /// Stops consuming, lets the message in hand finish, and unsubscribes.
    ///
    /// Calling this more than once has no further effect.
    pub async fn close(&self) {
        if let Some(task) = self.begin_close() {
            join(task).await;
        }
    }

    /// Like [`close`](Self::close), but aborts the task if it has not
    /// stopped within `timeout`. An aborted task drops the message in hand
    /// along with the outcome sender and the subscription.
    ///
    /// Returns false if the task had to be aborted.
    pub async fn close_within(&self, timeout: Duration) -> bool {
        let Some(mut task) = self.begin_close() else {
            return true;
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(result) => {
                if let Err(e) = result {
                    error!(error = %e, "Ingestion task failed");
                }
                true
            }
            Err(_) => {
                warn!(?timeout, "Ingestion did not stop in time, aborting");
                task.abort();
                join(task).await;
                false
            }
        }
    }

    fn begin_close(&self) -> Option<JoinHandle<()>> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return None;
        }
        // No receiver means the task already exited.
        let _ = self.shutdown_tx.send(());
        self.task.lock().take()
    }

    /// Returns true once the consuming task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.lock().as_ref().map_or(true, JoinHandle::is_finished)
    }
}

async fn join(task: JoinHandle<()>) {
    match task.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("Ingestion task aborted"),
        Err(e) => error!(error = %e, "Ingestion task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::order_channel;
    use async_trait::async_trait;
    use ordercache_service::{CacheStats, ResyncReport};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize};

    const SAMPLE: &[u8] = include_bytes!("../../../demos/model.json");

    /// Mock order repository for testing.
    #[derive(Default)]
    struct MockOrderRepository {
        saved: std::sync::Mutex<Vec<Order>>,
        next_id: AtomicI64,
        fixed_id: Option<i64>,
        fail_save: AtomicBool,
        hang_save: AtomicBool,
    }

    impl MockOrderRepository {
        fn returning(id: i64) -> Self {
            Self {
                fixed_id: Some(id),
                ..Self::default()
            }
        }

        fn save_calls(&self) -> usize {
            self.saved.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderRepository for MockOrderRepository {
        async fn save(&self, order: &Order) -> OrderResult<OrderId> {
            self.saved.lock().unwrap().push(order.clone());
            if self.hang_save.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(OrderError::persistence("Failed to insert item: value too long"));
            }
            let id = self
                .fixed_id
                .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            Ok(OrderId::new(id))
        }

        async fn find_by_id(&self, _id: OrderId) -> OrderResult<Option<Order>> {
            Ok(None)
        }

        async fn list_ids(&self) -> OrderResult<Vec<OrderId>> {
            Ok(Vec::new())
        }
    }

    /// Mock cache recording writes.
    #[derive(Default)]
    struct MockOrderCache {
        entries: std::sync::Mutex<HashMap<OrderId, Arc<Order>>>,
        set_calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderCacheInterface for MockOrderCache {
        async fn get(&self, id: OrderId) -> OrderResult<Arc<Order>> {
            self.entries
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| OrderError::order_not_found(id))
        }

        fn set(&self, id: OrderId, order: Order) {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().insert(id, Arc::new(order));
        }

        async fn resync_now(&self) -> OrderResult<ResyncReport> {
            Err(OrderError::internal("not used"))
        }

        fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        fn stats(&self) -> CacheStats {
            CacheStats::default()
        }
    }

    fn pipeline_with(
        repo: &Arc<MockOrderRepository>,
        cache: &Arc<MockOrderCache>,
    ) -> (IngestionPipeline, mpsc::Receiver<IngestOutcome>) {
        IngestionPipeline::new(
            Arc::clone(repo) as Arc<dyn OrderRepository>,
            Arc::clone(cache) as Arc<dyn OrderCacheInterface>,
            8,
        )
    }

    #[tokio::test]
    async fn test_valid_event_is_saved_cached_and_reported() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);

        pipeline.handle_event(SAMPLE).await;

        let id = outcomes.recv().await.unwrap().unwrap();
        assert_eq!(id, OrderId::new(1));
        assert_eq!(repo.save_calls(), 1);
        let cached = cache.get(id).await.unwrap();
        assert_eq!(*cached, repo.saved.lock().unwrap()[0]);
        assert_eq!(cached.order_uid, "b563feb7b2b84b6test");
    }

    #[tokio::test]
    async fn test_truncated_payload_is_a_decode_error_with_no_side_effects() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);

        pipeline.handle_event(&SAMPLE[..SAMPLE.len() / 2]).await;

        let outcome = outcomes.recv().await.unwrap();
        assert!(matches!(outcome, Err(OrderError::Decode(_))));
        assert!(outcomes.try_recv().is_err());
        assert_eq!(repo.save_calls(), 0);
        assert_eq!(cache.set_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_cache_alone() {
        let repo = Arc::new(MockOrderRepository::default());
        repo.fail_save.store(true, Ordering::SeqCst);
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);

        pipeline.handle_event(SAMPLE).await;

        assert!(matches!(outcomes.recv().await.unwrap(), Err(OrderError::Persistence(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unassigned_id_is_an_id_resolution_error() {
        let repo = Arc::new(MockOrderRepository::returning(0));
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);

        pipeline.handle_event(SAMPLE).await;

        assert!(matches!(outcomes.recv().await.unwrap(), Err(OrderError::IdResolution(_))));
        assert_eq!(repo.save_calls(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_bad_message_does_not_stop_the_next_one() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);
        let (publisher, subscriber) = order_channel("subject_orders", 8);
        let handle = pipeline.spawn(Box::new(subscriber));

        publisher.publish("{not json").await.unwrap();
        publisher.publish(SAMPLE).await.unwrap();

        assert!(matches!(outcomes.recv().await.unwrap(), Err(OrderError::Decode(_))));
        assert_eq!(outcomes.recv().await.unwrap().unwrap(), OrderId::new(1));
        assert_eq!(cache.len(), 1);

        handle.close().await;
    }

    #[tokio::test]
    async fn test_subscription_end_is_reported_and_terminal() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);
        let (publisher, subscriber) = order_channel("subject_orders", 1);
        let handle = pipeline.spawn(Box::new(subscriber));

        drop(publisher);

        assert!(matches!(outcomes.recv().await.unwrap(), Err(OrderError::Bus(_))));
        assert!(outcomes.recv().await.is_none());
        handle.close().await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_unsubscribes() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);
        let (publisher, subscriber) = order_channel("subject_orders", 1);
        let handle = pipeline.spawn(Box::new(subscriber));

        handle.close().await;
        handle.close().await;

        assert!(handle.is_finished());
        assert!(matches!(publisher.publish(SAMPLE).await, Err(OrderError::Bus(_))));
        assert!(outcomes.recv().await.is_none());
        assert_eq!(repo.save_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_within_aborts_a_stuck_message() {
        let repo = Arc::new(MockOrderRepository::default());
        repo.hang_save.store(true, Ordering::SeqCst);
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);
        let (publisher, subscriber) = order_channel("subject_orders", 1);
        let handle = pipeline.spawn(Box::new(subscriber));

        publisher.publish(SAMPLE).await.unwrap();
        while repo.save_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(!handle.close_within(Duration::from_secs(1)).await);
        assert!(handle.is_finished());
        // The aborted task released the outcome sender.
        assert!(outcomes.recv().await.is_none());
        assert!(cache.is_empty());
        assert!(handle.close_within(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_close_within_returns_true_when_idle() {
        let repo = Arc::new(MockOrderRepository::default());
        let cache = Arc::new(MockOrderCache::default());
        let (pipeline, mut outcomes) = pipeline_with(&repo, &cache);
        let (_publisher, subscriber) = order_channel("subject_orders", 1);
        let handle = pipeline.spawn(Box::new(subscriber));

        assert!(handle.close_within(Duration::from_secs(5)).await);
        assert!(outcomes.recv().await.is_none());
    }
}
