//! Monetary base series and its derived delta collector.
//!
//! `Monetary` is a plain window-parameterised CSV series. `MonetaryDelta` is
//! derived entirely from the stored monetary table: the raw series repeats
//! each figure until the next revision, so the delta of a run of identical
//! observations is spread evenly across the run. The delta source recomputes
//! the whole derived series on every fill and relies on the store's
//! first-write-wins dedupe to persist only the genuinely new dates.

use crate::env::Env;
use crate::error::UpdateError;
use crate::sources::feed::{CsvSpec, WindowCsvFeed};
use crate::store::{ColumnType, Row, Schema, Value};
use crate::update::{
    Dependency, FillProvider, SeriesUpdater, SourceInfo, SourceTable, Updater,
};
use chrono::NaiveDate;

pub const MONETARY: &str = "Monetary";
pub const MONETARY_DELTA: &str = "MonetaryDelta";

pub fn schema() -> Schema {
    Schema::new(&[("MBase", ColumnType::Float)])
}

pub fn delta_schema() -> Schema {
    Schema::new(&[("MBDelta", ColumnType::Float)])
}

/// Monetary base updater. Updating it also refreshes the derived delta
/// series, which reads the just-written monetary table.
pub fn updater(env: &Env) -> Box<dyn Updater> {
    let config = &env.config().monetary;
    let provider = WindowCsvFeed::new(
        &config.url_template,
        schema(),
        CsvSpec {
            date_column: config.date_column.clone(),
            date_format: config.date_format.clone(),
            columns: vec![config.value_column.clone()],
            select: None,
        },
        config.series_start,
        env.today(),
    );

    Box::new(
        SeriesUpdater::new(
            env,
            SourceInfo::new(MONETARY, "Monetary base"),
            SourceTable::new(env.table(MONETARY, schema()), Box::new(provider)),
        )
        .with_dependencies(vec![Dependency::named(delta_updater, &[MONETARY_DELTA])]),
    )
}

pub fn delta_updater(env: &Env) -> Box<dyn Updater> {
    Box::new(SeriesUpdater::new(
        env,
        SourceInfo::new(MONETARY_DELTA, "Monetary base delta"),
        SourceTable::new(
            env.table(MONETARY_DELTA, delta_schema()),
            Box::new(DeltaFill { env: env.clone() }),
        ),
    ))
}

/// Fill strategy that derives the delta series from the stored monetary
/// table instead of fetching anything.
struct DeltaFill {
    env: Env,
}

impl DeltaFill {
    fn derive(&self) -> Result<Vec<Row>, UpdateError> {
        let source = self.env.table(MONETARY, schema()).read(None, None)?;
        let values: Vec<f64> = source
            .iter()
            .map(|r| r.values[0].as_float().unwrap_or(f64::NAN))
            .collect();
        let deltas = spread_deltas(&values);

        Ok(source
            .iter()
            .zip(deltas)
            .map(|(row, delta)| Row::new(row.date, vec![Value::Float(delta)]))
            .collect())
    }
}

impl FillProvider for DeltaFill {
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError> {
        self.derive()
    }

    // Recomputing the whole series is cheap; dedupe keeps the write
    // incremental.
    fn fill(&mut self, _first: NaiveDate, _last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        self.derive()
    }
}

/// Per-observation deltas with each run of identical values sharing its
/// run's delta evenly. Output has the same length as the input; the first
/// run's delta is zero.
fn spread_deltas(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut runs: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        match runs.last_mut() {
            Some((run_value, count)) if *run_value == v => *count += 1,
            _ => runs.push((v, 1)),
        }
    }

    let mut deltas = Vec::with_capacity(values.len());
    let mut prev = values[0];
    for (value, count) in runs {
        let delta = (value - prev) / count as f64;
        deltas.extend(std::iter::repeat(delta).take(count));
        prev = value;
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn temp_env(today: NaiveDate) -> Env {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir()
            .join(format!("cotwatch_monetary_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let config = AppConfig { store_dir: dir, ..AppConfig::default() };
        Env::new(config).with_today(today)
    }

    #[test]
    fn spread_deltas_splits_runs_evenly() {
        // runs: [1,1] [2,2] [4] → first run delta 0, then (2-1)/2, then (4-2)/1
        assert_eq!(
            spread_deltas(&[1.0, 1.0, 2.0, 2.0, 4.0]),
            vec![0.0, 0.0, 0.5, 0.5, 2.0]
        );
    }

    #[test]
    fn spread_deltas_handles_trivial_inputs() {
        assert!(spread_deltas(&[]).is_empty());
        assert_eq!(spread_deltas(&[5.0]), vec![0.0]);
        assert_eq!(spread_deltas(&[5.0, 5.0, 5.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn delta_source_derives_from_stored_monetary_table() {
        let env = temp_env(date(4));
        env.table(MONETARY, schema())
            .write(&[
                Row::new(date(1), vec![Value::Float(100.0)]),
                Row::new(date(2), vec![Value::Float(100.0)]),
                Row::new(date(3), vec![Value::Float(104.0)]),
                Row::new(date(4), vec![Value::Float(104.0)]),
            ])
            .unwrap();

        let mut updater = delta_updater(&env);
        let results = updater.update_source(MONETARY_DELTA).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, (date(1), date(4)));

        let rows = env.table(MONETARY_DELTA, delta_schema()).read(None, None).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].values[0], Value::Float(0.0));
        assert_eq!(rows[2].values[0], Value::Float(4.0));
        let _ = fs::remove_dir_all(&env.config().store_dir);
    }

    #[test]
    fn delta_refill_only_persists_new_dates() {
        let env = temp_env(date(2));
        let monetary = env.table(MONETARY, schema());
        monetary
            .write(&[
                Row::new(date(1), vec![Value::Float(100.0)]),
                Row::new(date(2), vec![Value::Float(102.0)]),
            ])
            .unwrap();
        delta_updater(&env).update_source(MONETARY_DELTA).unwrap();

        // New monetary data arrives; the delta source is now stale
        monetary
            .write(&[Row::new(date(3), vec![Value::Float(103.0)])])
            .unwrap();
        let env = env.with_today(date(3));
        let results = delta_updater(&env).update_source(MONETARY_DELTA).unwrap();

        // The recomputed series covers everything, but only one date is new
        assert_eq!(results[0].range, (date(1), date(3)));
        let rows = env.table(MONETARY_DELTA, delta_schema()).read(None, None).unwrap();
        assert_eq!(rows.len(), 3);
        let _ = fs::remove_dir_all(&env.config().store_dir);
    }

    #[test]
    fn monetary_updater_declares_delta_dependency() {
        let env = temp_env(date(2));
        let updater = updater(&env);
        let deps = updater.dependencies(MONETARY);
        assert_eq!(deps.len(), 1);
        assert_eq!(
            deps[0].scope,
            crate::update::DepScope::Named(vec![MONETARY_DELTA.to_string()])
        );
        let _ = fs::remove_dir_all(&env.config().store_dir);
    }
}
