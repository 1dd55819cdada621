//! Data models
//!
//! Shared between the server and API clients. All ids are strings
//! (UUIDs for orders and transactions, external ids for users/products).

pub mod buyer;
pub mod cart;
pub mod order;
pub mod product;
pub mod transaction;

// Re-exports
pub use buyer::*;
pub use cart::*;
pub use order::*;
pub use product::*;
pub use transaction::*;
