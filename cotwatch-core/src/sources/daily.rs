//! Daily exchange bulletins.
//!
//! Unlike window-parameterised feeds, a bulletin publisher exposes a listing
//! of per-date files. The fill strategy therefore intersects the missing
//! window with the dates the publisher actually has — weekends, holidays and
//! not-yet-posted days simply are not in the listing. A bulletin carries one
//! row per contract; the configured contract's row is selected and stored
//! under the listing's date. Downloaded documents never change once posted,
//! so they go through the raw-document cache.

use crate::config::BulletinConfig;
use crate::env::Env;
use crate::error::UpdateError;
use crate::sources::feed::{parse_csv_rows, CsvSpec, HttpFeed};
use crate::store::{ColumnType, Row, Schema};
use crate::update::{
    DateRange, FillProvider, SourceInfo, SourceTable, Updatable, Updater,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-date columns of a daily bulletin.
pub fn schema() -> Schema {
    Schema::new(&[
        ("SET", ColumnType::Float),
        ("CHG", ColumnType::Float),
        ("VOL", ColumnType::Int),
        ("OI", ColumnType::Int),
        ("OIChg", ColumnType::Int),
    ])
}

/// A publisher of dated documents: what dates exist, and the rows for one.
pub trait DailyFeed {
    fn available_dates(&mut self) -> Result<Vec<NaiveDate>, UpdateError>;
    fn download_date(&mut self, date: NaiveDate) -> Result<Vec<Row>, UpdateError>;
}

/// Adapts a [`DailyFeed`] to the fill contract by clipping the publisher's
/// listing to the requested window.
pub struct DailyWindow {
    feed: Box<dyn DailyFeed>,
}

impl DailyWindow {
    pub fn new(feed: Box<dyn DailyFeed>) -> Self {
        Self { feed }
    }

    fn download_all(&mut self, mut dates: Vec<NaiveDate>) -> Result<Vec<Row>, UpdateError> {
        dates.sort();
        let mut rows = Vec::new();
        for date in dates {
            rows.extend(self.feed.download_date(date)?);
        }
        Ok(rows)
    }
}

impl FillProvider for DailyWindow {
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError> {
        let dates = self.feed.available_dates()?;
        self.download_all(dates)
    }

    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        let dates: Vec<NaiveDate> = self
            .feed
            .available_dates()?
            .into_iter()
            .filter(|d| *d >= first && *d <= last)
            .collect();
        self.download_all(dates)
    }
}

/// Extract the bulletin date from a listed file name shaped
/// `{prefix}{date}{suffix}`.
pub fn parse_bulletin_name(
    file: &str,
    prefix: &str,
    suffix: &str,
    date_format: &str,
) -> Option<NaiveDate> {
    let stem = file.strip_prefix(prefix)?.strip_suffix(suffix)?;
    NaiveDate::parse_from_str(stem, date_format).ok()
}

/// HTTP bulletin publisher: a listing endpoint plus per-file downloads.
struct BulletinFeed {
    env: Env,
    feed: HttpFeed,
    config: BulletinConfig,
    spec: CsvSpec,
    // listing is fetched once per update and remembered
    listing: Option<BTreeMap<NaiveDate, String>>,
}

impl BulletinFeed {
    fn new(env: &Env, config: BulletinConfig) -> Self {
        let spec = CsvSpec {
            date_column: "Date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec![
                "SET".into(),
                "CHG".into(),
                "VOL".into(),
                "OI".into(),
                "OIChg".into(),
            ],
            select: Some((config.contract_column.clone(), config.contract.clone())),
        };
        Self {
            env: env.clone(),
            feed: HttpFeed::new(),
            config,
            spec,
            listing: None,
        }
    }

    fn listing(&mut self) -> Result<&BTreeMap<NaiveDate, String>, UpdateError> {
        if self.listing.is_none() {
            let text = self.feed.get_text(&self.config.index_url)?;
            let mut listing = BTreeMap::new();
            for line in text.lines() {
                let file = line.trim();
                if let Some(date) = parse_bulletin_name(
                    file,
                    &self.config.file_prefix,
                    &self.config.file_suffix,
                    &self.config.date_format,
                ) {
                    listing.insert(date, file.to_string());
                }
            }
            self.listing = Some(listing);
        }
        Ok(self.listing.as_ref().unwrap())
    }
}

impl DailyFeed for BulletinFeed {
    fn available_dates(&mut self) -> Result<Vec<NaiveDate>, UpdateError> {
        Ok(self.listing()?.keys().copied().collect())
    }

    fn download_date(&mut self, date: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        let file = self
            .listing()?
            .get(&date)
            .cloned()
            .ok_or_else(|| {
                UpdateError::ResponseFormatChanged(format!("no bulletin listed for {date}"))
            })?;
        let url = self.config.download_url_template.replace("{file}", &file);

        let cache = self.env.doc_cache();
        let bytes = cache.get_or_fetch(&url, || self.feed.get_bytes(&url))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| UpdateError::ResponseFormatChanged(format!("bulletin not utf-8: {e}")))?;

        let rows = parse_csv_rows(&schema(), &self.spec, &text)?;
        let row = contract_row(rows, &self.config.contract, date)?;
        Ok(vec![row])
    }
}

/// The single row a bulletin contributes for its date: exactly one parsed
/// record may match the configured contract. The bulletin's own date column
/// is advisory; the listing's date is authoritative for where the row lands.
fn contract_row(
    mut rows: Vec<Row>,
    contract: &str,
    date: NaiveDate,
) -> Result<Row, UpdateError> {
    if rows.len() != 1 {
        return Err(UpdateError::ResponseFormatChanged(format!(
            "bulletin for {date} lists contract '{contract}' {} times, expected once",
            rows.len()
        )));
    }
    let mut row = rows.remove(0);
    row.date = date;
    Ok(row)
}

/// Updater over every configured bulletin publisher.
pub struct DailyBulletins {
    env: Env,
}

pub fn updater(env: &Env) -> Box<dyn Updater> {
    Box::new(DailyBulletins { env: env.clone() })
}

impl Updater for DailyBulletins {
    fn env(&self) -> &Env {
        &self.env
    }

    fn sources(&self) -> Vec<SourceInfo> {
        self.env
            .config()
            .daily
            .iter()
            .map(|b| SourceInfo::new(&b.name, &b.title))
            .collect()
    }

    fn update_source_impl(&mut self, source: &str) -> Result<DateRange, UpdateError> {
        let config = self
            .env
            .config()
            .daily
            .iter()
            .find(|b| b.name == source)
            .cloned()
            .ok_or_else(|| UpdateError::UnknownSource(source.to_string()))?;

        let feed = BulletinFeed::new(&self.env, config);
        let mut table = SourceTable::new(
            self.env.table(source, schema()),
            Box::new(DailyWindow::new(Box::new(feed))),
        );
        table.update(self.env.today())
    }
}
