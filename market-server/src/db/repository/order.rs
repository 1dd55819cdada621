//! Order Repository
//!
//! Orders are stored whole. Every write after creation is a compare-and-set
//! on `version`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::models::Order;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, from_rows, to_content};
use crate::db::store::{OrderFilter, OrderStore, StoreError, StoreResult};

const ORDER_TABLE: &str = "market_order";

#[derive(Debug, Deserialize)]
struct CounterRow {
    seq: u64,
}

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn next_order_sequence(&self) -> StoreResult<u64> {
        let rows: Vec<CounterRow> = self
            .base
            .db()
            .query("UPSERT type::thing('counter', 'order_number') SET seq += 1 RETURN seq")
            .await?
            .take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.seq)
            .ok_or_else(|| StoreError::Database("order counter returned no row".into()))
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.base
            .db()
            .query("CREATE type::thing($tb, $key) CONTENT $data RETURN NONE")
            .bind(("tb", ORDER_TABLE))
            .bind(("key", order.id.clone()))
            .bind(("data", to_content(order)?))
            .await?
            .check()
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("already exists") {
                    StoreError::Duplicate(format!("order {}", order.id))
                } else {
                    StoreError::Database(msg)
                }
            })?;
        Ok(())
    }

    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query("SELECT * OMIT id FROM type::thing($tb, $key)")
            .bind(("tb", ORDER_TABLE))
            .bind(("key", id.to_string()))
            .await?
            .take(0)?;
        Ok(from_rows(rows)?.into_iter().next())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut conditions = Vec::new();
        if filter.buyer_id.is_some() {
            conditions.push("buyer_id = $buyer");
        }
        if filter.seller_id.is_some() {
            conditions.push("seller_id = $seller");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT * OMIT id FROM {ORDER_TABLE} {where_clause} ORDER BY created_at DESC"
        );

        let rows: Vec<Value> = self
            .base
            .db()
            .query(sql)
            .bind(("buyer", filter.buyer_id.clone()))
            .bind(("seller", filter.seller_id.clone()))
            .bind(("status", filter.status.map(|s| s.as_str())))
            .await?
            .take(0)?;
        from_rows(rows)
    }

    async fn update_if_version(&self, order: &Order, expected: u64) -> StoreResult<bool> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query(
                "UPDATE type::thing($tb, $key) CONTENT $data WHERE version = $expected RETURN version",
            )
            .bind(("tb", ORDER_TABLE))
            .bind(("key", order.id.clone()))
            .bind(("data", to_content(order)?))
            .bind(("expected", expected))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }
}
