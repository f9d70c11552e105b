//! PostgreSQL order repository implementation.

use crate::{traits::OrderRepository, DatabasePoolInterface};
use async_trait::async_trait;
use ordercache_core::{Delivery, Item, Order, OrderError, OrderId, OrderResult, Payment};
use sqlx::{FromRow, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// PostgreSQL order repository.
///
/// An aggregate spans four tables; `save` writes them in one transaction and
/// `find_by_id` only returns aggregates whose delivery and payment rows exist.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl PgOrderRepository {
    /// Creates a new PostgreSQL order repository.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: String,
    oof_shard: String,
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i64,
    payment_dt: i64,
    bank: String,
    delivery_cost: i64,
    goods_total: i64,
    custom_fee: i64,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i64,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i64,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Self {
            name: row.name,
            phone: row.phone,
            zip: row.zip,
            city: row.city,
            address: row.address,
            region: row.region,
            email: row.email,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            transaction: row.transaction,
            request_id: row.request_id,
            currency: row.currency,
            provider: row.provider,
            amount: row.amount,
            payment_dt: row.payment_dt,
            bank: row.bank,
            delivery_cost: row.delivery_cost,
            goods_total: row.goods_total,
            custom_fee: row.custom_fee,
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            chrt_id: row.chrt_id,
            track_number: row.track_number,
            price: row.price,
            rid: row.rid,
            name: row.name,
            sale: row.sale,
            size: row.size,
            total_price: row.total_price,
            nm_id: row.nm_id,
            brand: row.brand,
            status: row.status,
        }
    }
}

fn assemble(order: OrderRow, delivery: DeliveryRow, payment: PaymentRow, items: Vec<ItemRow>) -> Order {
    Order {
        order_uid: order.order_uid,
        track_number: order.track_number,
        entry: order.entry,
        delivery: delivery.into(),
        payment: payment.into(),
        items: items.into_iter().map(Item::from).collect(),
        locale: order.locale,
        internal_signature: order.internal_signature,
        customer_id: order.customer_id,
        delivery_service: order.delivery_service,
        shardkey: order.shardkey,
        sm_id: order.sm_id,
        date_created: order.date_created,
        oof_shard: order.oof_shard,
    }
}

fn persistence(step: &'static str) -> impl Fn(sqlx::Error) -> OrderError {
    move |e| OrderError::persistence(format!("Failed to {}: {}", step, e))
}

async fn insert_children(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    order: &Order,
) -> OrderResult<()> {
    let delivery = &order.delivery;
    sqlx::query(
        r#"
        INSERT INTO deliveries (order_id, name, phone, zip, city, address, region, email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(order_id)
    .bind(&delivery.name)
    .bind(&delivery.phone)
    .bind(&delivery.zip)
    .bind(&delivery.city)
    .bind(&delivery.address)
    .bind(&delivery.region)
    .bind(&delivery.email)
    .execute(&mut **tx)
    .await
    .map_err(persistence("insert delivery"))?;

    let payment = &order.payment;
    sqlx::query(
        r#"
        INSERT INTO payments (order_id, transaction, request_id, currency, provider, amount,
                              payment_dt, bank, delivery_cost, goods_total, custom_fee)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(order_id)
    .bind(&payment.transaction)
    .bind(&payment.request_id)
    .bind(&payment.currency)
    .bind(&payment.provider)
    .bind(payment.amount)
    .bind(payment.payment_dt)
    .bind(&payment.bank)
    .bind(payment.delivery_cost)
    .bind(payment.goods_total)
    .bind(payment.custom_fee)
    .execute(&mut **tx)
    .await
    .map_err(persistence("insert payment"))?;

    for item in &order.items {
        sqlx::query(
            r#"
            INSERT INTO items (order_id, chrt_id, track_number, price, rid, name, sale, size,
                               total_price, nm_id, brand, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order_id)
        .bind(item.chrt_id)
        .bind(&item.track_number)
        .bind(item.price)
        .bind(&item.rid)
        .bind(&item.name)
        .bind(item.sale)
        .bind(&item.size)
        .bind(item.total_price)
        .bind(item.nm_id)
        .bind(&item.brand)
        .bind(item.status)
        .execute(&mut **tx)
        .await
        .map_err(persistence("insert item"))?;
    }

    Ok(())
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn save(&self, order: &Order) -> OrderResult<OrderId> {
        debug!(order_uid = %order.order_uid, items = order.item_count(), "Saving order");

        let mut tx = self
            .pool
            .inner()
            .begin()
            .await
            .map_err(persistence("begin transaction"))?;

        let order_id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shardkey, sm_id, date_created,
                                oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING order_id
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(&order.date_created)
        .bind(&order.oof_shard)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence("insert order"))?;

        // Dropping `tx` on any early return rolls the whole aggregate back.
        let order_id = order_id.ok_or_else(|| {
            OrderError::IdResolution(format!("no id returned for order {}", order.order_uid))
        })?;

        insert_children(&mut tx, order_id, order).await?;

        tx.commit().await.map_err(persistence("commit transaction"))?;

        debug!(order_id, order_uid = %order.order_uid, "Order saved");
        Ok(OrderId::new(order_id))
    }

    async fn find_by_id(&self, id: OrderId) -> OrderResult<Option<Order>> {
        debug!("Finding order by id: {}", id);

        let mut conn = self.pool.inner().acquire().await?;

        let Some(order) = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_uid, track_number, entry, locale, internal_signature, customer_id,
                   delivery_service, shardkey, sm_id, date_created, oof_shard
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let delivery = sqlx::query_as::<_, DeliveryRow>(
            "SELECT name, phone, zip, city, address, region, email FROM deliveries WHERE order_id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT transaction, request_id, currency, provider, amount, payment_dt, bank,
                   delivery_cost, goods_total, custom_fee
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;

        let (Some(delivery), Some(payment)) = (delivery, payment) else {
            warn!("Order {} is missing its delivery or payment row", id);
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT chrt_id, track_number, price, rid, name, sale, size, total_price,
                   nm_id, brand, status
            FROM items
            WHERE order_id = $1
            ORDER BY item_id
            "#,
        )
        .bind(id.into_inner())
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(assemble(order, delivery, payment, items)))
    }

    async fn list_ids(&self) -> OrderResult<Vec<OrderId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT order_id FROM orders ORDER BY order_id")
            .fetch_all(self.pool.inner())
            .await?;

        Ok(ids.into_iter().map(OrderId::new).collect())
    }
}
