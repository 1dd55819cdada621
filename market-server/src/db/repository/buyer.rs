//! Buyer Repository
//!
//! Reads the `user` table owned by the account service.

use async_trait::async_trait;
use serde_json::Value;
use shared::models::BuyerProfile;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, from_rows, to_content};
use crate::db::store::{BuyerDirectory, StoreResult};

#[derive(Clone)]
pub struct BuyerRepository {
    base: BaseRepository,
}

impl BuyerRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl BuyerDirectory for BuyerRepository {
    async fn find_buyer(&self, id: &str) -> StoreResult<Option<BuyerProfile>> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query("SELECT * OMIT id FROM type::thing('user', $key)")
            .bind(("key", id.to_string()))
            .await?
            .take(0)?;
        Ok(from_rows(rows)?.into_iter().next())
    }

    async fn save_buyer(&self, profile: &BuyerProfile) -> StoreResult<()> {
        self.base
            .db()
            .query("UPSERT type::thing('user', $key) CONTENT $data RETURN NONE")
            .bind(("key", profile.id.clone()))
            .bind(("data", to_content(profile)?))
            .await?
            .check()?;
        Ok(())
    }
}
