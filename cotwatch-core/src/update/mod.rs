//! The incremental update engine.

pub mod composite;
pub mod manager;
pub mod resource;
pub mod updatable;
pub mod updater;

pub use composite::CompositeUpdater;
pub use manager::{Registry, UpdateManager};
pub use resource::{FillProvider, SeriesUpdater, SourceTable};
pub use updatable::{reduce_ranges, written_range, DateRange, Updatable};
pub use updater::{
    DepScope, Dependency, Flavor, FlavorUpdater, MakeUpdater, SourceConfig, SourceInfo,
    UpdateResult, Updater,
};
