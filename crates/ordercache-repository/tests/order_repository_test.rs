//! Integration tests for PgOrderRepository.
//!
//! These tests run against a real PostgreSQL database using testcontainers.
//! Requires Docker to be available on the system.

mod common;

use common::{sample_order, TestDatabase};
use ordercache_core::{OrderError, OrderId};
use ordercache_repository::{DatabasePoolInterface, OrderRepository, PgOrderRepository};

#[tokio::test]
async fn test_save_and_find_by_id() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());
    let order = sample_order();

    let id = repo.save(&order).await.expect("Failed to save order");
    assert!(id.is_assigned());

    let found = repo
        .find_by_id(id)
        .await
        .expect("Query failed")
        .expect("Order not found");

    assert_eq!(found, order);
}

#[tokio::test]
async fn test_save_returns_distinct_ids() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());
    let order = sample_order();

    let first = repo.save(&order).await.expect("Failed to save order");
    let second = repo.save(&order).await.expect("Failed to save order");

    assert_ne!(first, second);
    assert!(second > first);
}

#[tokio::test]
async fn test_find_by_id_not_found() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let result = repo.find_by_id(OrderId::new(999)).await.expect("Query failed");
    assert!(result.is_none());
}

#[tokio::test]
async fn test_items_keep_insertion_order() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let mut order = sample_order();
    let mut second = order.items[0].clone();
    second.name = "Lipstick".to_string();
    let mut third = order.items[0].clone();
    third.name = "Mascaras again".to_string();
    order.items.push(second);
    order.items.push(third);

    let id = repo.save(&order).await.expect("Failed to save order");
    let found = repo.find_by_id(id).await.unwrap().unwrap();

    let names: Vec<&str> = found.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Mascaras", "Lipstick", "Mascaras again"]);
    assert_eq!(found.items[0].chrt_id, found.items[2].chrt_id);
}

#[tokio::test]
async fn test_order_without_items() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let mut order = sample_order();
    order.items.clear();

    let id = repo.save(&order).await.expect("Failed to save order");
    let found = repo.find_by_id(id).await.unwrap().unwrap();
    assert!(found.items.is_empty());
}

#[tokio::test]
async fn test_64_bit_fields_roundtrip() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let mut order = sample_order();
    order.sm_id = 3_000_000_000;
    order.items[0].sale = 4_000_000_000;
    order.items[0].status = 5_000_000_000;

    let id = repo.save(&order).await.expect("Failed to save order");
    let found = repo
        .find_by_id(id)
        .await
        .expect("Query failed")
        .expect("Order not found");

    assert_eq!(found.sm_id, 3_000_000_000);
    assert_eq!(found.items[0].sale, 4_000_000_000);
    assert_eq!(found.items[0].status, 5_000_000_000);
}

#[tokio::test]
async fn test_failed_item_insert_leaves_nothing_behind() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let mut order = sample_order();
    let mut bad = order.items[0].clone();
    bad.name = "x".repeat(1000);
    order.items.push(bad);

    let err = repo.save(&order).await.unwrap_err();
    assert!(matches!(err, OrderError::Persistence(_)));

    assert_eq!(db.count("orders").await, 0);
    assert_eq!(db.count("deliveries").await, 0);
    assert_eq!(db.count("payments").await, 0);
    assert_eq!(db.count("items").await, 0);
    assert!(repo.list_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_ids_ascending() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());
    let order = sample_order();

    let mut saved = Vec::new();
    for _ in 0..3 {
        saved.push(repo.save(&order).await.unwrap());
    }

    assert_eq!(repo.list_ids().await.unwrap(), saved);
}

#[tokio::test]
async fn test_partial_aggregate_is_not_found() {
    let db = TestDatabase::new().await;
    let repo = PgOrderRepository::new(db.pool());

    let id = repo.save(&sample_order()).await.unwrap();
    sqlx::query("DELETE FROM payments WHERE order_id = $1")
        .bind(id.into_inner())
        .execute(db.pool().inner())
        .await
        .unwrap();

    assert!(repo.find_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_health_check() {
    let db = TestDatabase::new().await;
    assert!(db.pool().health_check().await.is_ok());
}
