//! Database Module
//!
//! Storage traits, the embedded SurrealDB backend and the in-memory backend.

pub mod memory;
pub mod repository;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, SurrealKv};

pub use memory::MemoryStore;
pub use store::{
    BuyerDirectory, CartStore, InventoryStore, OrderFilter, OrderStore, StoreError, StoreResult,
    TransactionStore,
};

use repository::{
    BuyerRepository, CartRepository, OrderRepository, ProductRepository, TransactionRepository,
};

const NAMESPACE: &str = "market";
const DATABASE: &str = "market";

/// Store handles shared by the services
#[derive(Clone)]
pub struct Stores {
    pub inventory: Arc<dyn InventoryStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub buyers: Arc<dyn BuyerDirectory>,
}

impl Stores {
    /// Everything backed by one [`MemoryStore`]
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            inventory: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            transactions: store.clone(),
            buyers: store,
        }
    }

    pub fn surreal(db: Surreal<Db>) -> Self {
        Self {
            inventory: Arc::new(ProductRepository::new(db.clone())),
            carts: Arc::new(CartRepository::new(db.clone())),
            orders: Arc::new(OrderRepository::new(db.clone())),
            transactions: Arc::new(TransactionRepository::new(db.clone())),
            buyers: Arc::new(BuyerRepository::new(db)),
        }
    }
}

/// Open (or create) the embedded database at `path`
pub async fn open_surreal(path: &Path) -> StoreResult<Surreal<Db>> {
    std::fs::create_dir_all(path)
        .map_err(|e| StoreError::Database(format!("Failed to create {}: {e}", path.display())))?;
    let db = Surreal::new::<SurrealKv>(path).await?;
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    tracing::info!(path = %path.display(), "Database connection established (SurrealKV)");
    Ok(db)
}

/// Volatile SurrealDB instance
pub async fn open_surreal_memory() -> StoreResult<Surreal<Db>> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    Ok(db)
}
