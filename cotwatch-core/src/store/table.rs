//! Per-source Parquet table with date-range semantics.
//!
//! Layout: `{store_dir}/{source}.parquet`, one file per source.
//!
//! Guarantees:
//! - `range()` is always derived from the stored rows, never cached — the
//!   presence/absence of rows *is* the range state, there is no manifest.
//! - `write()` is idempotent on the date key: a date already stored is
//!   silently skipped (first write wins), so re-fetching an overlapping
//!   window and writing it again never duplicates or clobbers rows.
//! - Writes are atomic: write to .tmp, rename into place.

use super::schema::{ColumnType, Row, Schema, Value};
use crate::error::UpdateError;
use crate::update::updatable::DateRange;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A single source's persisted table.
pub struct TableStore {
    dir: PathBuf,
    name: String,
    schema: Schema,
}

impl TableStore {
    pub fn open(dir: impl Into<PathBuf>, name: &str, schema: Schema) -> Self {
        Self {
            dir: dir.into(),
            name: name.to_string(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.parquet", self.name))
    }

    /// Current persisted bounds, `None` while the table is empty.
    pub fn range(&self) -> Result<DateRange, UpdateError> {
        let rows = self.load_all()?;
        Ok(match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        })
    }

    /// Append rows, skipping any date already stored (first write wins).
    ///
    /// Returns the number of rows actually written.
    pub fn write(&self, rows: &[Row]) -> Result<usize, UpdateError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in rows {
            self.schema
                .validate(row)
                .map_err(UpdateError::Validation)?;
        }

        let mut stored = self.load_all()?;
        let mut seen: HashSet<NaiveDate> = stored.iter().map(|r| r.date).collect();

        let mut written = 0;
        for row in rows {
            if seen.insert(row.date) {
                stored.push(row.clone());
                written += 1;
            }
        }
        if written == 0 {
            return Ok(0);
        }

        stored.sort_by_key(|r| r.date);

        fs::create_dir_all(&self.dir)
            .map_err(|e| UpdateError::Store(format!("failed to create dir: {e}")))?;

        let df = rows_to_dataframe(&self.schema, &stored)?;
        let path = self.path();
        let tmp_path = path.with_extension("parquet.tmp");

        // A failure anywhere before the rename must not leave the .tmp behind
        if let Err(e) = write_parquet(&df, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            UpdateError::Store(format!("atomic rename failed: {e}"))
        })?;

        Ok(written)
    }

    /// Stored rows ordered by date, optionally clipped to inclusive bounds.
    pub fn read(
        &self,
        begin: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Row>, UpdateError> {
        let rows = self.load_all()?;
        Ok(rows
            .into_iter()
            .filter(|r| begin.map_or(true, |b| r.date >= b) && end.map_or(true, |e| r.date <= e))
            .collect())
    }

    /// All stored rows sorted by date; empty when the file does not exist.
    fn load_all(&self) -> Result<Vec<Row>, UpdateError> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rows = load_parquet(&self.schema, &path)?;
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn rows_to_dataframe(schema: &Schema, rows: &[Row]) -> Result<DataFrame, UpdateError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();

    let mut columns = vec![Column::new("date".into(), dates)
        .cast(&DataType::Date)
        .map_err(|e| UpdateError::Parquet(format!("date cast: {e}")))?];

    for (idx, (name, ty)) in schema.columns().iter().enumerate() {
        let column = match ty {
            ColumnType::Float => {
                let vals: Vec<f64> = rows
                    .iter()
                    .map(|r| match &r.values[idx] {
                        Value::Float(v) => *v,
                        _ => f64::NAN,
                    })
                    .collect();
                Column::new(name.as_str().into(), vals)
            }
            ColumnType::Int => {
                let vals: Vec<i64> = rows
                    .iter()
                    .map(|r| match &r.values[idx] {
                        Value::Int(v) => *v,
                        _ => 0,
                    })
                    .collect();
                Column::new(name.as_str().into(), vals)
            }
            ColumnType::Text => {
                let vals: Vec<String> = rows
                    .iter()
                    .map(|r| match &r.values[idx] {
                        Value::Text(v) => v.clone(),
                        _ => String::new(),
                    })
                    .collect();
                Column::new(name.as_str().into(), vals)
            }
        };
        columns.push(column);
    }

    DataFrame::new(columns)
        .map_err(|e| UpdateError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), UpdateError> {
    let file =
        fs::File::create(path).map_err(|e| UpdateError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| UpdateError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_parquet(schema: &Schema, path: &Path) -> Result<Vec<Row>, UpdateError> {
    let file = fs::File::open(path).map_err(|e| UpdateError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| UpdateError::Parquet(format!("read: {e}")))?;
    dataframe_to_rows(schema, &df)
}

fn dataframe_to_rows(schema: &Schema, df: &DataFrame) -> Result<Vec<Row>, UpdateError> {
    let n = df.height();

    let date_col = df
        .column("date")
        .map_err(|e| UpdateError::Parquet(format!("column read: {e}")))?;
    let date_ca = date_col
        .date()
        .map_err(|e| UpdateError::Parquet(format!("date column type: {e}")))?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let mut rows = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| UpdateError::Parquet(format!("null date at row {i}")))?;
        let date = epoch + chrono::Duration::days(date_days as i64);

        let mut values = Vec::with_capacity(schema.width());
        for (name, ty) in schema.columns() {
            let col = df
                .column(name)
                .map_err(|e| UpdateError::Parquet(format!("missing column '{name}': {e}")))?;
            let value = match ty {
                ColumnType::Float => {
                    let ca = col
                        .f64()
                        .map_err(|e| UpdateError::Parquet(format!("column '{name}' type: {e}")))?;
                    Value::Float(ca.get(i).unwrap_or(f64::NAN))
                }
                ColumnType::Int => {
                    let ca = col
                        .i64()
                        .map_err(|e| UpdateError::Parquet(format!("column '{name}' type: {e}")))?;
                    Value::Int(ca.get(i).unwrap_or(0))
                }
                ColumnType::Text => {
                    let ca = col
                        .str()
                        .map_err(|e| UpdateError::Parquet(format!("column '{name}' type: {e}")))?;
                    Value::Text(ca.get(i).unwrap_or("").to_string())
                }
            };
            values.push(value);
        }
        rows.push(Row::new(date, values));
    }

    Ok(rows)
}
