//! Shared application context threaded through every updater.
//!
//! Cheap to clone; dependency fan-out constructs a fresh updater per
//! invocation and hands each one a clone. The `today` override exists so
//! tests (and replays) can pin the clock — the update state machine decides
//! "is this source current" against this value.

use crate::config::AppConfig;
use crate::store::{NetCache, Schema, TableStore};
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Clone)]
pub struct Env {
    config: Arc<AppConfig>,
    today_override: Option<NaiveDate>,
}

impl Env {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            today_override: None,
        }
    }

    /// Pin "today" to a fixed date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Handle on the named source's persisted table.
    pub fn table(&self, name: &str, schema: Schema) -> TableStore {
        TableStore::open(&self.config.store_dir, name, schema)
    }

    /// Handle on the raw-document cache.
    pub fn doc_cache(&self) -> NetCache {
        NetCache::new(&self.config.cache_dir)
    }
}
