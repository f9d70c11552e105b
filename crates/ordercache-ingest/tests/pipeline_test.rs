//! End-to-end ingestion over the in-process bus with a live cache.

use async_trait::async_trait;
use ordercache_core::{Order, OrderError, OrderId, OrderResult};
use ordercache_ingest::{order_channel, IngestionPipeline};
use ordercache_repository::OrderRepository;
use ordercache_service::{OrderCache, OrderCacheInterface, OrderService, OrderServiceImpl};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SAMPLE: &[u8] = include_bytes!("../../../demos/model.json");

/// In-memory store that assigns ids like a sequence.
#[derive(Default)]
struct InMemoryOrderRepository {
    rows: Mutex<BTreeMap<OrderId, Order>>,
    find_calls: AtomicUsize,
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> OrderResult<OrderId> {
        let mut rows = self.rows.lock().unwrap();
        let id = OrderId::new(rows.len() as i64 + 1);
        rows.insert(id, order.clone());
        Ok(id)
    }

    async fn find_by_id(&self, id: OrderId) -> OrderResult<Option<Order>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn list_ids(&self) -> OrderResult<Vec<OrderId>> {
        Ok(self.rows.lock().unwrap().keys().copied().collect())
    }
}

#[tokio::test]
async fn test_ingested_order_is_served_without_store_reads() {
    let repo = Arc::new(InMemoryOrderRepository::default());
    let cache = Arc::new(
        OrderCache::start(Arc::clone(&repo) as Arc<dyn OrderRepository>, Duration::from_secs(60)).unwrap(),
    );
    let (pipeline, mut outcomes) = IngestionPipeline::new(
        Arc::clone(&repo) as Arc<dyn OrderRepository>,
        Arc::clone(&cache) as Arc<dyn OrderCacheInterface>,
        4,
    );
    let (publisher, subscriber) = order_channel("subject_orders", 4);
    let handle = pipeline.spawn(Box::new(subscriber));

    publisher.publish(SAMPLE).await.unwrap();
    let id = outcomes.recv().await.unwrap().unwrap();

    let service = OrderServiceImpl::new(Arc::clone(&cache) as Arc<dyn OrderCacheInterface>);
    let order = service.get_order(id).await.unwrap();
    assert_eq!(order.order_uid, "b563feb7b2b84b6test");
    assert_eq!(*order, Order::decode(SAMPLE).unwrap());
    assert_eq!(repo.find_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.cache_stats().hits, 1);
    assert_eq!(service.cache_stats().misses, 0);

    handle.close().await;
    cache.close();
}

#[tokio::test]
async fn test_each_event_gets_its_own_id() {
    let repo = Arc::new(InMemoryOrderRepository::default());
    let cache = Arc::new(
        OrderCache::start(Arc::clone(&repo) as Arc<dyn OrderRepository>, Duration::from_secs(60)).unwrap(),
    );
    let (pipeline, mut outcomes) = IngestionPipeline::new(
        Arc::clone(&repo) as Arc<dyn OrderRepository>,
        Arc::clone(&cache) as Arc<dyn OrderCacheInterface>,
        4,
    );
    let (publisher, subscriber) = order_channel("subject_orders", 4);
    let handle = pipeline.spawn(Box::new(subscriber));

    publisher.publish(SAMPLE).await.unwrap();
    publisher.publish(SAMPLE).await.unwrap();

    let first = outcomes.recv().await.unwrap().unwrap();
    let second = outcomes.recv().await.unwrap().unwrap();
    assert!(first < second);
    assert_eq!(cache.len(), 2);

    handle.close().await;
    cache.close();
}

#[tokio::test]
async fn test_decode_failure_touches_neither_store_nor_cache() {
    let repo = Arc::new(InMemoryOrderRepository::default());
    let cache = Arc::new(
        OrderCache::start(Arc::clone(&repo) as Arc<dyn OrderRepository>, Duration::from_secs(60)).unwrap(),
    );
    let (pipeline, mut outcomes) = IngestionPipeline::new(
        Arc::clone(&repo) as Arc<dyn OrderRepository>,
        Arc::clone(&cache) as Arc<dyn OrderCacheInterface>,
        4,
    );
    let (publisher, subscriber) = order_channel("subject_orders", 4);
    let handle = pipeline.spawn(Box::new(subscriber));

    publisher.publish(&SAMPLE[..40]).await.unwrap();

    assert!(matches!(outcomes.recv().await.unwrap(), Err(OrderError::Decode(_))));
    assert!(repo.rows.lock().unwrap().is_empty());
    assert!(cache.is_empty());

    handle.close().await;
    cache.close();
}
