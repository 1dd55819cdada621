//! Cart Repository
//!
//! One `cart` record per buyer, keyed by buyer id.

use async_trait::async_trait;
use serde_json::Value;
use shared::models::Cart;
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, from_rows, to_content};
use crate::db::store::{CartStore, StoreResult};

#[derive(Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn find_cart(&self, buyer_id: &str) -> StoreResult<Option<Cart>> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query("SELECT * OMIT id FROM type::thing('cart', $key)")
            .bind(("key", buyer_id.to_string()))
            .await?
            .take(0)?;
        Ok(from_rows(rows)?.into_iter().next())
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        self.base
            .db()
            .query("UPSERT type::thing('cart', $key) CONTENT $data RETURN NONE")
            .bind(("key", cart.buyer_id.clone()))
            .bind(("data", to_content(cart)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn clear_cart(&self, buyer_id: &str) -> StoreResult<()> {
        self.base
            .db()
            .query(
                "UPDATE type::thing('cart', $key) SET items = [], subtotal = 0.0, item_count = 0, updated_at = $now RETURN NONE",
            )
            .bind(("key", buyer_id.to_string()))
            .bind(("now", now_millis()))
            .await?
            .check()?;
        Ok(())
    }
}
