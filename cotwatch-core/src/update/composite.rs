//! Grouping of unrelated updaters under one named virtual source.
//!
//! "Update all" must complete even when one publisher is unreachable, so a
//! member failing with a transient connectivity error is logged and skipped;
//! its contribution for this run is simply empty. Any other failure is a
//! programming or data error and propagates.

use crate::env::Env;
use crate::error::UpdateError;
use crate::update::updatable::DateRange;
use crate::update::updater::{MakeUpdater, SourceInfo, UpdateResult, Updater};
use tracing::warn;

pub struct CompositeUpdater {
    env: Env,
    name: String,
    members: Vec<MakeUpdater>,
}

impl CompositeUpdater {
    pub fn new(env: &Env, name: &str, members: Vec<MakeUpdater>) -> Self {
        Self {
            env: env.clone(),
            name: name.to_string(),
            members,
        }
    }
}

impl Updater for CompositeUpdater {
    fn env(&self) -> &Env {
        &self.env
    }

    fn sources(&self) -> Vec<SourceInfo> {
        vec![SourceInfo::new(&self.name, &self.name)]
    }

    // The composite has no table of its own; all work happens in
    // update_source.
    fn update_source_impl(&mut self, _source: &str) -> Result<DateRange, UpdateError> {
        Ok(None)
    }

    fn update_source(&mut self, _source: &str) -> Result<Vec<UpdateResult>, UpdateError> {
        let mut results = Vec::new();

        for make in &self.members {
            let mut member = make(&self.env);
            match member.update_entire() {
                Ok(member_results) => results.extend(member_results),
                Err(e) if e.is_transient() => {
                    warn!(group = %self.name, error = %e, "skipping unreachable member");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }
}
