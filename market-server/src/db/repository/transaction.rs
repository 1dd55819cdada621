//! Payment Transaction Repository

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{Settlement, Transaction};
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, from_rows, to_content};
use crate::db::store::{StoreResult, TransactionStore};

#[derive(Clone)]
pub struct TransactionRepository {
    base: BaseRepository,
}

impl TransactionRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn find_one(&self, field: &'static str, value: &str) -> StoreResult<Option<Transaction>> {
        let sql = format!(
            "SELECT * OMIT id FROM payment_transaction WHERE {field} = $value ORDER BY created_at DESC"
        );
        let rows: Vec<Value> = self
            .base
            .db()
            .query(sql)
            .bind(("value", value.to_string()))
            .await?
            .take(0)?;
        Ok(from_rows(rows)?.into_iter().next())
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn insert_transaction(&self, txn: &Transaction) -> StoreResult<()> {
        self.base
            .db()
            .query("CREATE type::thing('payment_transaction', $key) CONTENT $data RETURN NONE")
            .bind(("key", txn.id.clone()))
            .bind(("data", to_content(txn)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Transaction>> {
        self.find_one("reference", reference).await
    }

    async fn find_by_gateway_id(&self, gateway_id: &str) -> StoreResult<Option<Transaction>> {
        self.find_one("gateway_transaction_id", gateway_id).await
    }

    async fn list_for_order(&self, order_id: &str) -> StoreResult<Vec<Transaction>> {
        let rows: Vec<Value> = self
            .base
            .db()
            .query("SELECT * OMIT id FROM payment_transaction WHERE order_id = $order ORDER BY created_at ASC")
            .bind(("order", order_id.to_string()))
            .await?
            .take(0)?;
        from_rows(rows)
    }

    async fn settle(&self, id: &str, settlement: &Settlement) -> StoreResult<bool> {
        // Success may replace a failure, never the reverse
        let rows: Vec<Value> = self
            .base
            .db()
            .query(
                "UPDATE type::thing('payment_transaction', $key) SET
                    status = $status,
                    gateway_transaction_id = $gateway_id ?? gateway_transaction_id,
                    metadata = $metadata,
                    updated_at = $now
                 WHERE status IN $from
                 RETURN status",
            )
            .bind(("key", id.to_string()))
            .bind(("status", settlement.status))
            .bind(("gateway_id", settlement.gateway_transaction_id.clone()))
            .bind(("metadata", settlement.metadata.clone()))
            .bind(("now", now_millis()))
            .bind(("from", settlement.status.settleable_from().to_vec()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }
}
