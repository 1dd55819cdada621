//! Repository Module
//!
//! SurrealDB implementations of the storage traits.

pub mod buyer;
pub mod cart;
pub mod order;
pub mod product;
pub mod transaction;

// Re-exports
pub use buyer::BuyerRepository;
pub use cart::CartRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use transaction::TransactionRepository;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::store::StoreResult;

// =============================================================================
// Record convention
// =============================================================================
//
// 记录 ID 为 type::thing(table, <domain id>)。
// 领域结构体的 `id` 字段在写入时改名为 `key`，读取时 `SELECT * OMIT id`
// 再改回 `id`，避免 RecordId 与字符串 id 冲突。
//
// 分页在内存中完成：嵌入式引擎上 WHERE + LIMIT 会丢失记录。

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

/// Serialize a domain value into record content (`id` → `key`)
pub(crate) fn to_content<T: Serialize>(value: &T) -> StoreResult<Value> {
    let mut content = serde_json::to_value(value)?;
    if let Some(obj) = content.as_object_mut()
        && let Some(id) = obj.remove("id")
    {
        obj.insert("key".to_string(), id);
    }
    Ok(content)
}

/// Deserialize a row selected with `OMIT id` (`key` → `id`)
pub(crate) fn from_row<T: DeserializeOwned>(mut row: Value) -> StoreResult<T> {
    if let Some(obj) = row.as_object_mut()
        && let Some(key) = obj.remove("key")
    {
        obj.insert("id".to_string(), key);
    }
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
