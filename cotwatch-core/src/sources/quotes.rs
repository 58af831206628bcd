//! Configured price pairs over a window-parameterised CSV endpoint.
//!
//! Pairs come from the app config; each one is a flavor sharing the OHLC
//! schema, so adding a pair is a config change, not a code change.

use crate::env::Env;
use crate::error::UpdateError;
use crate::sources::feed::{CsvSpec, WindowCsvFeed};
use crate::store::{ColumnType, Schema};
use crate::update::{DateRange, Flavor, FlavorUpdater, SourceTable, Updatable, Updater};

pub fn schema() -> Schema {
    Schema::new(&[
        ("Open", ColumnType::Float),
        ("High", ColumnType::Float),
        ("Low", ColumnType::Float),
        ("Close", ColumnType::Float),
    ])
}

fn csv_spec() -> CsvSpec {
    CsvSpec {
        date_column: "Date".into(),
        date_format: "%Y-%m-%d".into(),
        columns: vec!["Open".into(), "High".into(), "Low".into(), "Close".into()],
        select: None,
    }
}

pub struct Quotes {
    env: Env,
}

pub fn updater(env: &Env) -> Box<dyn Updater> {
    Box::new(Quotes { env: env.clone() })
}

impl FlavorUpdater for Quotes {
    fn env(&self) -> &Env {
        &self.env
    }

    fn flavors(&self) -> Vec<Flavor> {
        self.env
            .config()
            .quotes
            .iter()
            .map(|q| Flavor {
                name: q.name.clone(),
                title: q.name.clone(),
                schema: schema(),
                atoms_donor: true,
            })
            .collect()
    }

    fn update_flavor(&mut self, flavor: &Flavor) -> Result<DateRange, UpdateError> {
        let quote = self
            .env
            .config()
            .quotes
            .iter()
            .find(|q| q.name == flavor.name)
            .cloned()
            .ok_or_else(|| UpdateError::UnknownSource(flavor.name.clone()))?;

        let provider = WindowCsvFeed::new(
            &quote.url_template,
            flavor.schema.clone(),
            csv_spec(),
            quote.series_start,
            self.env.today(),
        );

        let mut source = SourceTable::new(
            self.env.table(&flavor.name, flavor.schema.clone()),
            Box::new(provider),
        );
        source.update(self.env.today())
    }
}
