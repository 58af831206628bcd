//! Persisted per-source tables and the raw-document cache.

pub mod netcache;
pub mod schema;
pub mod table;

pub use netcache::NetCache;
pub use schema::{ColumnType, Row, Schema, Value};
pub use table::TableStore;
