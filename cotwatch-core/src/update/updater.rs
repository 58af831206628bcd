//! Per-source-group update drivers with recursive dependency fan-out.
//!
//! An [`Updater`] owns a catalogue of named sources. Updating one source runs
//! its own fetch first, then every declared dependency, depth-first in
//! declaration order. Dependency updaters are constructed fresh for every
//! invocation so dependents always observe the freshest persisted state of
//! what they depend on, never a stale handle.

use crate::env::Env;
use crate::error::UpdateError;
use crate::update::updatable::DateRange;
use chrono::NaiveDate;
use serde::Serialize;

use crate::store::Schema;

/// Constructor for an updater; dependencies and registries hold these rather
/// than live instances.
pub type MakeUpdater = fn(&Env) -> Box<dyn Updater>;

/// Catalogue entry advertised by an updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub title: String,
}

impl SourceInfo {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
        }
    }
}

/// Which of a dependency updater's sources to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepScope {
    /// The dependency updater's entire catalogue.
    All,
    /// Exactly these named sources, in order.
    Named(Vec<String>),
}

/// A declared dependency edge: updating the owning source also updates this.
#[derive(Clone)]
pub struct Dependency {
    pub make: MakeUpdater,
    pub scope: DepScope,
}

impl Dependency {
    pub fn all(make: MakeUpdater) -> Self {
        Self {
            make,
            scope: DepScope::All,
        }
    }

    pub fn named(make: MakeUpdater, names: &[&str]) -> Self {
        Self {
            make,
            scope: DepScope::Named(names.iter().map(|s| s.to_string()).collect()),
        }
    }
}

/// One source's contribution to an update batch: the date bounds of the rows
/// actually written. Sources that had nothing to fetch contribute no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub source: String,
    pub range: (NaiveDate, NaiveDate),
}

/// Per-source display configuration handed to the exterior (GUI/CLI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub title: String,
    /// Column names this source donates to the formula layer.
    pub atoms: Vec<String>,
}

/// Driver for a group of sources.
pub trait Updater {
    fn env(&self) -> &Env;

    /// The catalogue this updater owns.
    fn sources(&self) -> Vec<SourceInfo>;

    /// Run the named source's own update, without dependencies.
    fn update_source_impl(&mut self, source: &str) -> Result<DateRange, UpdateError>;

    /// Dependency edges declared for the named source.
    fn dependencies(&self, _source: &str) -> Vec<Dependency> {
        Vec::new()
    }

    /// Display configuration for the named source.
    fn source_config(&self, source: &str) -> Option<SourceConfig> {
        self.sources()
            .into_iter()
            .find(|info| info.name == source)
            .map(|info| SourceConfig {
                name: info.name,
                title: info.title,
                atoms: Vec::new(),
            })
    }

    /// Update the named source, then recursively every declared dependency.
    ///
    /// The source's own result comes first (absent when nothing was fetched),
    /// dependents follow in declaration order.
    fn update_source(&mut self, source: &str) -> Result<Vec<UpdateResult>, UpdateError> {
        let mut results = Vec::new();

        if let Some(range) = self.update_source_impl(source)? {
            results.push(UpdateResult {
                source: source.to_string(),
                range,
            });
        }

        for dep in self.dependencies(source) {
            let mut updater = (dep.make)(self.env());
            match &dep.scope {
                DepScope::All => results.extend(updater.update_entire()?),
                DepScope::Named(names) => {
                    for name in names {
                        results.extend(updater.update_source(name)?);
                    }
                }
            }
        }

        Ok(results)
    }

    /// Update every source in the catalogue, in catalogue order.
    fn update_entire(&mut self) -> Result<Vec<UpdateResult>, UpdateError> {
        let mut results = Vec::new();
        for info in self.sources() {
            results.extend(self.update_source(&info.name)?);
        }
        Ok(results)
    }
}

/// Configuration template shared by a family of sources.
#[derive(Debug, Clone)]
pub struct Flavor {
    pub name: String,
    pub title: String,
    pub schema: Schema,
    /// Whether this flavor's columns are exported as formula atoms.
    pub atoms_donor: bool,
}

/// Specialization of [`Updater`] for updaters whose sources all share one
/// schema/behavior template. Implementors describe their flavors and how to
/// update one; the catalogue, dispatch, and display config are derived.
pub trait FlavorUpdater {
    fn env(&self) -> &Env;

    fn flavors(&self) -> Vec<Flavor>;

    fn update_flavor(&mut self, flavor: &Flavor) -> Result<DateRange, UpdateError>;

    fn flavor_dependencies(&self, _flavor: &Flavor) -> Vec<Dependency> {
        Vec::new()
    }
}

impl<T: FlavorUpdater> Updater for T {
    fn env(&self) -> &Env {
        FlavorUpdater::env(self)
    }

    fn sources(&self) -> Vec<SourceInfo> {
        self.flavors()
            .into_iter()
            .map(|f| SourceInfo::new(&f.name, &f.title))
            .collect()
    }

    fn update_source_impl(&mut self, source: &str) -> Result<DateRange, UpdateError> {
        let flavor = self
            .flavors()
            .into_iter()
            .find(|f| f.name == source)
            .ok_or_else(|| UpdateError::UnknownSource(source.to_string()))?;
        self.update_flavor(&flavor)
    }

    fn dependencies(&self, source: &str) -> Vec<Dependency> {
        match self.flavors().into_iter().find(|f| f.name == source) {
            Some(flavor) => self.flavor_dependencies(&flavor),
            None => Vec::new(),
        }
    }

    fn source_config(&self, source: &str) -> Option<SourceConfig> {
        self.flavors()
            .into_iter()
            .find(|f| f.name == source)
            .map(|f| SourceConfig {
                name: f.name.clone(),
                title: f.title.clone(),
                atoms: if f.atoms_donor {
                    f.schema.atoms()
                } else {
                    Vec::new()
                },
            })
    }
}
