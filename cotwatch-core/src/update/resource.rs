//! Binding a single persisted table into the update graph.
//!
//! `SourceTable` pairs one [`TableStore`] with the fetch strategy for its
//! feed; the strategy is a boxed [`FillProvider`] rather than a subclass, so
//! one engine drives arbitrarily many heterogeneous feeds. `SeriesUpdater`
//! then exposes a single `SourceTable` as a one-source [`Updater`] with an
//! optional dependency list.

use crate::env::Env;
use crate::error::UpdateError;
use crate::store::{Row, TableStore};
use crate::update::updatable::{DateRange, Updatable};
use crate::update::updater::{Dependency, SourceConfig, SourceInfo, Updater};
use chrono::NaiveDate;

/// The fetch-and-parse collaborator for one source.
///
/// Implementations own the publisher specifics (endpoints, document formats);
/// the engine only decides *when* to call which strategy. One call's output
/// must not contain duplicate dates.
pub trait FillProvider {
    /// Everything available for a source with no persisted data yet.
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError>;

    /// Rows for an explicit missing window (inclusive bounds).
    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError>;
}

/// A table-backed source: persisted rows plus the strategy that extends them.
pub struct SourceTable {
    table: TableStore,
    provider: Box<dyn FillProvider>,
}

impl SourceTable {
    pub fn new(table: TableStore, provider: Box<dyn FillProvider>) -> Self {
        Self { table, provider }
    }

    pub fn table(&self) -> &TableStore {
        &self.table
    }
}

impl Updatable for SourceTable {
    fn range(&self) -> Result<DateRange, UpdateError> {
        self.table.range()
    }

    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError> {
        self.provider.initial_fill()
    }

    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        self.provider.fill(first, last)
    }

    fn write_update(&mut self, rows: &[Row]) -> Result<(), UpdateError> {
        self.table.write(rows).map(|_| ())
    }
}

/// One-source updater over a [`SourceTable`], no fan-out of its own unless
/// dependencies are declared.
pub struct SeriesUpdater {
    env: Env,
    info: SourceInfo,
    source: SourceTable,
    atoms_donor: bool,
    deps: Vec<Dependency>,
}

impl SeriesUpdater {
    pub fn new(env: &Env, info: SourceInfo, source: SourceTable) -> Self {
        Self {
            env: env.clone(),
            info,
            source,
            atoms_donor: true,
            deps: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<Dependency>) -> Self {
        self.deps = deps;
        self
    }

    pub fn atoms_donor(mut self, donor: bool) -> Self {
        self.atoms_donor = donor;
        self
    }
}

impl Updater for SeriesUpdater {
    fn env(&self) -> &Env {
        &self.env
    }

    fn sources(&self) -> Vec<SourceInfo> {
        vec![self.info.clone()]
    }

    fn update_source_impl(&mut self, source: &str) -> Result<DateRange, UpdateError> {
        if source != self.info.name {
            return Err(UpdateError::UnknownSource(source.to_string()));
        }
        self.source.update(self.env.today())
    }

    fn dependencies(&self, source: &str) -> Vec<Dependency> {
        if source == self.info.name {
            self.deps.clone()
        } else {
            Vec::new()
        }
    }

    fn source_config(&self, source: &str) -> Option<SourceConfig> {
        if source != self.info.name {
            return None;
        }
        Some(SourceConfig {
            name: self.info.name.clone(),
            title: self.info.title.clone(),
            atoms: if self.atoms_donor {
                self.source.table().schema().atoms()
            } else {
                Vec::new()
            },
        })
    }
}
