//! Product Repository

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::models::Product;
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, from_rows, to_content};
use crate::db::store::{InventoryStore, StoreError, StoreResult};

#[derive(Debug, Deserialize)]
struct StockRow {
    stock: i64,
}

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Unconditional stock delta
    async fn adjust(&self, product_id: &str, delta: i64) -> StoreResult<i64> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE type::thing('product', $key) SET stock += $delta, updated_at = $now RETURN stock;
                 UPDATE type::thing('product', $key) SET available = stock > 0 RETURN NONE;",
            )
            .bind(("key", product_id.to_string()))
            .bind(("delta", delta))
            .bind(("now", now_millis()))
            .await?;
        let rows: Vec<StockRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.stock)
            .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))
    }
}

#[async_trait]
impl InventoryStore for ProductRepository {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query("SELECT * OMIT id FROM type::thing('product', $key)")
            .bind(("key", id.to_string()))
            .await?
            .take(0)?;
        Ok(from_rows(rows)?.into_iter().next())
    }

    async fn save_product(&self, product: &Product) -> StoreResult<()> {
        self.base
            .db()
            .query("UPSERT type::thing('product', $key) CONTENT $data RETURN NONE")
            .bind(("key", product.id.clone()))
            .bind(("data", to_content(product)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn reserve(&self, product_id: &str, quantity: i64) -> StoreResult<Option<i64>> {
        // Conditional decrement: the WHERE guard and the write are one statement
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE type::thing('product', $key) SET stock -= $qty, updated_at = $now WHERE stock >= $qty RETURN stock;
                 UPDATE type::thing('product', $key) SET available = stock > 0 RETURN NONE;",
            )
            .bind(("key", product_id.to_string()))
            .bind(("qty", quantity))
            .bind(("now", now_millis()))
            .await?;
        let rows: Vec<StockRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.stock))
    }

    async fn force_reserve(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.adjust(product_id, -quantity).await
    }

    async fn release(&self, product_id: &str, quantity: i64) -> StoreResult<i64> {
        self.adjust(product_id, quantity).await
    }
}
