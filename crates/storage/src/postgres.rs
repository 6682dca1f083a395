//! Postgres adapter for the durable store.
//!
//! The write path normalizes one aggregate into five tables inside a single
//! transaction; the read path rebuilds the hydrated aggregate with one
//! aggregating query so the JSON that comes back deserializes straight into
//! `Order`.

use crate::{OrderStore, StorageError};
use async_trait::async_trait;
use domain::Order;
use sqlx::PgPool;
use tracing::{info, warn};

const INSERT_DELIVERY: &str = "
    insert into delivery_info (name, phone, zip, city, address, region, email)
    values ($1, $2, $3, $4, $5, $6, $7)
    returning id";

const INSERT_PAYMENT: &str = "
    insert into payment_info (transaction, request_id, currency, provider, amount,
                              payment_dt, bank, delivery_cost, goods_total, custom_fee)
    values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    returning id";

const INSERT_ORDER: &str = "
    insert into orders (order_uid, track_number, entry, delivery_id, payment_id,
                        locale, internal_signature, customer_id, delivery_service,
                        shardkey, sm_id, date_created, oof_shard)
    values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    returning id";

const UPSERT_ITEM: &str = "
    insert into items (chrt_id, track_number, price, rid, name, sale, size,
                       total_price, nm_id, brand, status)
    values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    on conflict (chrt_id) do nothing";

const INSERT_ORDER_ITEM: &str = "
    insert into orders_items (order_id, item_id) values ($1, $2)
    on conflict do nothing";

/// Shared select list: one hydrated aggregate per order row, shaped exactly
/// like the wire JSON.
const ORDER_JSON: &str = "
    json_build_object(
        'order_uid', o.order_uid,
        'track_number', o.track_number,
        'entry', o.entry,
        'locale', o.locale,
        'internal_signature', o.internal_signature,
        'customer_id', o.customer_id,
        'delivery_service', o.delivery_service,
        'shardkey', o.shardkey,
        'sm_id', o.sm_id,
        'date_created', o.date_created,
        'oof_shard', o.oof_shard,
        'delivery', json_build_object(
            'name', di.name,
            'phone', di.phone,
            'zip', di.zip,
            'city', di.city,
            'address', di.address,
            'region', di.region,
            'email', di.email
        ),
        'payment', json_build_object(
            'transaction', p.transaction,
            'request_id', p.request_id,
            'currency', p.currency,
            'provider', p.provider,
            'amount', p.amount,
            'payment_dt', p.payment_dt,
            'bank', p.bank,
            'delivery_cost', p.delivery_cost,
            'goods_total', p.goods_total,
            'custom_fee', p.custom_fee
        ),
        'items', (
            select coalesce(json_agg(json_build_object(
                'chrt_id', i.chrt_id,
                'track_number', i.track_number,
                'price', i.price,
                'rid', i.rid,
                'name', i.name,
                'sale', i.sale,
                'size', i.size,
                'total_price', i.total_price,
                'nm_id', i.nm_id,
                'brand', i.brand,
                'status', i.status
            )), '[]'::json)
            from orders_items as oi
            join items as i on oi.item_id = i.chrt_id
            where oi.order_id = o.id
        )
    )";

pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn find_query() -> String {
        format!(
            "select {ORDER_JSON} from orders as o
             join delivery_info as di on o.delivery_id = di.id
             join payment_info as p on o.payment_id = p.id
             where o.order_uid = $1"
        )
    }

    fn recent_query() -> String {
        format!(
            "select {ORDER_JSON} from orders as o
             join delivery_info as di on o.delivery_id = di.id
             join payment_info as p on o.payment_id = p.id
             order by o.id desc
             limit $1"
        )
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn add(&self, order: &Order) -> Result<(), StorageError> {
        let uid = &order.order_uid;
        let classify = |err: sqlx::Error| StorageError::from_sqlx(err, uid);

        let mut tx = self.pool.begin().await.map_err(classify)?;

        let delivery_id: i64 = sqlx::query_scalar(INSERT_DELIVERY)
            .bind(&order.delivery.name)
            .bind(&order.delivery.phone)
            .bind(&order.delivery.zip)
            .bind(&order.delivery.city)
            .bind(&order.delivery.address)
            .bind(&order.delivery.region)
            .bind(&order.delivery.email)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        let payment_id: i64 = sqlx::query_scalar(INSERT_PAYMENT)
            .bind(&order.payment.transaction)
            .bind(&order.payment.request_id)
            .bind(&order.payment.currency)
            .bind(&order.payment.provider)
            .bind(order.payment.amount)
            .bind(order.payment.payment_dt)
            .bind(&order.payment.bank)
            .bind(order.payment.delivery_cost)
            .bind(order.payment.goods_total)
            .bind(order.payment.custom_fee)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        let order_id: i64 = sqlx::query_scalar(INSERT_ORDER)
            .bind(&order.order_uid)
            .bind(&order.track_number)
            .bind(&order.entry)
            .bind(delivery_id)
            .bind(payment_id)
            .bind(&order.locale)
            .bind(&order.internal_signature)
            .bind(&order.customer_id)
            .bind(&order.delivery_service)
            .bind(&order.shardkey)
            .bind(order.sm_id)
            .bind(&order.date_created)
            .bind(&order.oof_shard)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        for item in &order.items {
            sqlx::query(UPSERT_ITEM)
                .bind(item.chrt_id)
                .bind(&item.track_number)
                .bind(item.price)
                .bind(&item.rid)
                .bind(&item.name)
                .bind(item.sale as i16)
                .bind(&item.size)
                .bind(item.total_price)
                .bind(item.nm_id)
                .bind(&item.brand)
                .bind(item.status)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

            sqlx::query(INSERT_ORDER_ITEM)
                .bind(order_id)
                .bind(item.chrt_id)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;
        info!(order_uid = %uid, "order persisted");
        Ok(())
    }

    async fn find(&self, order_uid: &str) -> Result<Order, StorageError> {
        let row: Option<serde_json::Value> = sqlx::query_scalar(&Self::find_query())
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::from_sqlx(err, order_uid))?;

        match row {
            Some(json) => Ok(serde_json::from_value(json)?),
            None => Err(StorageError::NotFound),
        }
    }

    async fn get_recent(&self, limit: i64) -> Result<Vec<Order>, StorageError> {
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&Self::recent_query())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::from_sqlx(err, ""))?;

        let mut orders = Vec::with_capacity(rows.len());
        for json in rows {
            match serde_json::from_value::<Order>(json) {
                Ok(order) => orders.push(order),
                // A single bad row must not fail the warm-up batch.
                Err(err) => warn!(%err, "skipping undecodable order row"),
            }
        }
        Ok(orders)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_reference_all_five_tables() {
        let find = PostgresOrderStore::find_query();
        for table in [
            "orders",
            "delivery_info",
            "payment_info",
            "items",
            "orders_items",
        ] {
            assert!(find.contains(table), "find query misses {table}");
        }
        assert!(PostgresOrderStore::recent_query().contains("order by o.id desc"));
    }

    #[test]
    fn test_transient_classification() {
        let err = StorageError::from_sqlx(sqlx::Error::PoolTimedOut, "uid1");
        assert!(err.is_transient());

        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(StorageError::from_sqlx(io, "uid1").is_transient());

        let not_found = StorageError::from_sqlx(sqlx::Error::RowNotFound, "uid1");
        assert!(matches!(not_found, StorageError::NotFound));
    }
}
