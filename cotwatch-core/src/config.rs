//! Application configuration (TOML).
//!
//! Captures everything the updaters need to reach their publishers: storage
//! directories, endpoint URL templates, and the configured quote pairs.
//! Feed URL templates use `{begin}`/`{end}` (ISO dates), `{year}`, or
//! `{file}` placeholders depending on how the publisher partitions data.

use crate::error::UpdateError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one Parquet table per source.
    pub store_dir: PathBuf,

    /// Directory for the raw-document cache.
    pub cache_dir: PathBuf,

    pub monetary: MonetaryConfig,
    pub cftc: WeeklyConfig,
    pub ice: WeeklyConfig,
    pub daily: Vec<BulletinConfig>,
    pub quotes: Vec<QuoteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("data/store"),
            cache_dir: PathBuf::from("data/docs"),
            monetary: MonetaryConfig::default(),
            cftc: WeeklyConfig {
                url_template: "https://www.cftc.gov/files/dea/history/fut_fin_txt_{year}.csv"
                    .into(),
                first_year: 2006,
                market_column: "Market and Exchange Names".into(),
                market: "GOLD - COMMODITY EXCHANGE INC.".into(),
            },
            ice: WeeklyConfig {
                url_template: "https://www.ice.com/publicdocs/futures/COTHist{year}.csv".into(),
                first_year: 2011,
                market_column: "Market_and_Exchange_Names".into(),
                market: "Brent Crude Futures - ICE Futures Europe".into(),
            },
            daily: vec![BulletinConfig::default()],
            quotes: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, UpdateError> {
        let text = fs::read_to_string(path)
            .map_err(|e| UpdateError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| UpdateError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Load from the given path, falling back to defaults when absent.
    pub fn load_or_default(path: &Path) -> Result<Self, UpdateError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Monetary base series endpoint (FRED-style CSV export).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetaryConfig {
    pub url_template: String,
    /// CSV header of the date column.
    pub date_column: String,
    /// CSV header of the observation column.
    pub value_column: String,
    pub date_format: String,
    /// Earliest date the series exists for; the initial fill starts here.
    pub series_start: NaiveDate,
}

impl Default for MonetaryConfig {
    fn default() -> Self {
        Self {
            url_template:
                "https://fred.stlouisfed.org/graph/fredgraph.csv?id=BOGMBASE&cosd={begin}&coed={end}"
                    .into(),
            date_column: "observation_date".into(),
            value_column: "BOGMBASE".into(),
            date_format: "%Y-%m-%d".into(),
            series_start: NaiveDate::from_ymd_opt(1959, 1, 1).unwrap(),
        }
    }
}

/// Weekly commitments-of-traders report family, published as one CSV per year.
///
/// The annual files interleave every market the publisher covers, one row per
/// market per report date; `market` picks the single market this source
/// tracks so the stored series has one row per date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyConfig {
    pub url_template: String,
    /// First year the publisher has files for.
    pub first_year: i32,
    /// CSV header of the market-name column.
    pub market_column: String,
    /// Exact market name to keep, as the publisher spells it.
    pub market: String,
}

/// One daily-bulletin publisher: a listing endpoint naming per-date files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletinConfig {
    /// Source name; must be unique across all updaters.
    pub name: String,
    pub title: String,
    /// Endpoint returning the published file names, one per line.
    pub index_url: String,
    /// Template for downloading one listed file (`{file}` placeholder).
    pub download_url_template: String,
    /// Bulletin file names are `{prefix}{date}{suffix}`.
    pub file_prefix: String,
    pub file_suffix: String,
    pub date_format: String,
    /// CSV header of the contract column; bulletins carry one row per
    /// contract per date.
    pub contract_column: String,
    /// Exact contract name whose row this source stores.
    pub contract: String,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            name: "CmeBulletin".into(),
            title: "CME daily bulletin".into(),
            index_url: "https://www.cmegroup.com/daily_bulletin/index.txt".into(),
            download_url_template: "https://www.cmegroup.com/daily_bulletin/{file}".into(),
            file_prefix: "DailyBulletin_".into(),
            file_suffix: ".csv".into(),
            date_format: "%Y%m%d".into(),
            contract_column: "CONTRACT".into(),
            contract: "GC".into(),
        }
    }
}

/// One configured price pair fetched over a window-parameterised CSV endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    pub name: String,
    pub url_template: String,
    pub series_start: NaiveDate,
}
