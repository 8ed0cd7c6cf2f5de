//! SQLite-backed cache for extracted product records.
//!
//! Records are keyed by normalized page URL and stored with async access via
//! tokio-rusqlite. Freshness is decided by the caller against a TTL; this
//! layer only stores, loads, deletes and purges.

pub mod connection;
pub mod migrations;
pub mod products;

pub use crate::Error;

pub use connection::CacheDb;
pub use products::ProductStore;
