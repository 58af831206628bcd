//! Concrete source families and the composite groups over them.

pub mod circuit;
pub mod daily;
pub mod feed;
pub mod monetary;
pub mod quotes;
pub mod weekly;

use crate::env::Env;
use crate::update::{CompositeUpdater, Updater};

/// All daily-cadence publishers under one virtual source.
pub fn update_daily(env: &Env) -> Box<dyn Updater> {
    Box::new(CompositeUpdater::new(
        env,
        "Update daily",
        vec![daily::updater],
    ))
}

/// Every source family under one virtual source. An unreachable publisher
/// is skipped, so this always completes with whatever subset succeeded.
pub fn update_all(env: &Env) -> Box<dyn Updater> {
    Box::new(CompositeUpdater::new(
        env,
        "Update all",
        vec![
            monetary::updater,
            weekly::cftc,
            weekly::ice,
            quotes::updater,
            daily::updater,
        ],
    ))
}
