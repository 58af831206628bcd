//! cotwatch core — incremental market-data update engine.
//!
//! Tracks commodity-futures market data (commitments-of-traders reports,
//! exchange daily bulletins, monetary base, price quotes) in per-source
//! Parquet tables and keeps each source current by fetching only the date
//! window it is missing:
//! - Per-source range tracking derived from the stored rows themselves
//! - EMPTY/POPULATED update state machine, idempotent under retry
//! - Recursive dependency fan-out between update jobs
//! - Composite "update all" groups with per-member network-fault isolation

pub mod config;
pub mod env;
pub mod error;
pub mod sources;
pub mod store;
pub mod update;

pub use config::AppConfig;
pub use env::Env;
pub use error::UpdateError;
pub use update::{Registry, UpdateManager, UpdateResult};
