//! Process-wide updater registry and name → owner dispatch.
//!
//! The registry is built explicitly at startup and injected into the
//! manager; nothing is registered through module-level globals. Source names
//! are expected to be globally unique by construction — on a collision the
//! later registration silently owns the name.

use crate::env::Env;
use crate::error::UpdateError;
use crate::sources;
use crate::update::updater::{MakeUpdater, SourceConfig, SourceInfo, UpdateResult, Updater};
use std::collections::HashMap;

/// Explicit, read-only list of updater constructors.
pub struct Registry {
    factories: Vec<MakeUpdater>,
}

impl Registry {
    pub fn new(factories: Vec<MakeUpdater>) -> Self {
        Self { factories }
    }

    /// The production catalogue: every concrete source family plus the
    /// composite groups.
    pub fn standard() -> Self {
        Self::new(vec![
            sources::monetary::updater,
            sources::monetary::delta_updater,
            sources::weekly::cftc,
            sources::weekly::ice,
            sources::daily::updater,
            sources::quotes::updater,
            sources::update_daily,
            sources::update_all,
        ])
    }

    pub fn factories(&self) -> &[MakeUpdater] {
        &self.factories
    }
}

/// Top-level entry point the exterior (GUI/CLI) talks to.
pub struct UpdateManager {
    updaters: Vec<Box<dyn Updater>>,
    source_map: HashMap<String, usize>,
}

impl UpdateManager {
    pub fn new(env: &Env, registry: &Registry) -> Self {
        let updaters: Vec<Box<dyn Updater>> =
            registry.factories().iter().map(|make| make(env)).collect();

        let mut source_map = HashMap::new();
        for (idx, updater) in updaters.iter().enumerate() {
            for info in updater.sources() {
                source_map.insert(info.name, idx);
            }
        }

        Self { updaters, source_map }
    }

    /// Run the named source under its owning updater.
    pub fn update_source(&mut self, source: &str) -> Result<Vec<UpdateResult>, UpdateError> {
        let idx = *self
            .source_map
            .get(source)
            .ok_or_else(|| UpdateError::UnknownSource(source.to_string()))?;
        self.updaters[idx].update_source(source)
    }

    /// Flattened catalogue across all registered updaters, in registration
    /// order.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.updaters.iter().flat_map(|u| u.sources()).collect()
    }

    /// Display configuration for the named source.
    pub fn config(&self, source: &str) -> Result<SourceConfig, UpdateError> {
        let idx = *self
            .source_map
            .get(source)
            .ok_or_else(|| UpdateError::UnknownSource(source.to_string()))?;
        self.updaters[idx]
            .source_config(source)
            .ok_or_else(|| UpdateError::UnknownSource(source.to_string()))
    }
}
