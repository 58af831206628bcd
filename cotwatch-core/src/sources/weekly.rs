//! Weekly commitments-of-traders reports (CFTC and ICE).
//!
//! Both publishers partition history into one CSV per year, so the fill
//! strategy fetches every year the missing window touches and clips to the
//! window. The annual files interleave every market, one row per market per
//! report date; the configured market is selected at parse time so each
//! stored series keeps one row per date. Column layouts differ per
//! publisher; each flavor carries its own CSV mapping onto the shared COT
//! schema.

use crate::env::Env;
use crate::error::UpdateError;
use crate::sources::feed::{parse_csv_rows, CsvSpec, HttpFeed};
use crate::store::{ColumnType, Row, Schema};
use crate::update::{
    DateRange, Flavor, FlavorUpdater, FillProvider, SourceTable, Updatable, Updater,
};
use chrono::{Datelike, NaiveDate};

pub const CFTC_FUTURES_ONLY: &str = "cftc_futures_only";
pub const ICE_FUTURES_ONLY: &str = "ice_futures_only";

/// The COT position columns every weekly flavor shares.
pub fn schema() -> Schema {
    Schema::new(&[
        ("OI", ColumnType::Int),
        ("NCL", ColumnType::Int),
        ("NCS", ColumnType::Int),
        ("NCSp", ColumnType::Int),
        ("CL", ColumnType::Int),
        ("CS", ColumnType::Int),
        ("NRL", ColumnType::Int),
        ("NRS", ColumnType::Int),
    ])
}

struct WeeklyFlavor {
    flavor: Flavor,
    spec: CsvSpec,
    url_template: String,
    first_year: i32,
}

pub struct WeeklyReports {
    env: Env,
    catalogue: Vec<WeeklyFlavor>,
}

pub fn cftc(env: &Env) -> Box<dyn Updater> {
    let config = &env.config().cftc;
    Box::new(WeeklyReports {
        env: env.clone(),
        catalogue: vec![WeeklyFlavor {
            flavor: Flavor {
                name: CFTC_FUTURES_ONLY.into(),
                title: "CFTC futures only".into(),
                schema: schema(),
                atoms_donor: true,
            },
            spec: CsvSpec {
                date_column: "As of Date in Form YYYY-MM-DD".into(),
                date_format: "%Y-%m-%d".into(),
                columns: vec![
                    "Open Interest (All)".into(),
                    "Noncommercial Positions-Long (All)".into(),
                    "Noncommercial Positions-Short (All)".into(),
                    "Noncommercial Positions-Spreading (All)".into(),
                    "Commercial Positions-Long (All)".into(),
                    "Commercial Positions-Short (All)".into(),
                    "Nonreportable Positions-Long (All)".into(),
                    "Nonreportable Positions-Short (All)".into(),
                ],
                select: Some((config.market_column.clone(), config.market.clone())),
            },
            url_template: config.url_template.clone(),
            first_year: config.first_year,
        }],
    })
}

pub fn ice(env: &Env) -> Box<dyn Updater> {
    let config = &env.config().ice;
    Box::new(WeeklyReports {
        env: env.clone(),
        catalogue: vec![WeeklyFlavor {
            flavor: Flavor {
                name: ICE_FUTURES_ONLY.into(),
                title: "ICE futures only".into(),
                schema: schema(),
                atoms_donor: true,
            },
            spec: CsvSpec {
                date_column: "As_of_Date_In_Form_YYYY-MM-DD".into(),
                date_format: "%Y-%m-%d".into(),
                columns: vec![
                    "Open_Interest_All".into(),
                    "NonComm_Positions_Long_All".into(),
                    "NonComm_Positions_Short_All".into(),
                    "NonComm_Positions_Spread_All".into(),
                    "Comm_Positions_Long_All".into(),
                    "Comm_Positions_Short_All".into(),
                    "NonRept_Positions_Long_All".into(),
                    "NonRept_Positions_Short_All".into(),
                ],
                select: Some((config.market_column.clone(), config.market.clone())),
            },
            url_template: config.url_template.clone(),
            first_year: config.first_year,
        }],
    })
}

impl FlavorUpdater for WeeklyReports {
    fn env(&self) -> &Env {
        &self.env
    }

    fn flavors(&self) -> Vec<Flavor> {
        self.catalogue.iter().map(|w| w.flavor.clone()).collect()
    }

    fn update_flavor(&mut self, flavor: &Flavor) -> Result<DateRange, UpdateError> {
        let weekly = self
            .catalogue
            .iter()
            .find(|w| w.flavor.name == flavor.name)
            .ok_or_else(|| UpdateError::UnknownSource(flavor.name.clone()))?;

        let provider = AnnualCsvFeed {
            feed: HttpFeed::new(),
            url_template: weekly.url_template.clone(),
            schema: flavor.schema.clone(),
            spec: weekly.spec.clone(),
            first_year: weekly.first_year,
            today: self.env.today(),
        };

        let mut source = SourceTable::new(
            self.env.table(&flavor.name, flavor.schema.clone()),
            Box::new(provider),
        );
        source.update(self.env.today())
    }
}

/// Fill strategy for feeds published as one CSV per year.
struct AnnualCsvFeed {
    feed: HttpFeed,
    url_template: String,
    schema: Schema,
    spec: CsvSpec,
    first_year: i32,
    today: NaiveDate,
}

impl AnnualCsvFeed {
    fn fetch_window(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        let mut rows = Vec::new();
        for year in first.year()..=last.year() {
            let url = self.url_template.replace("{year}", &year.to_string());
            let text = self.feed.get_text(&url)?;
            rows.extend(parse_csv_rows(&self.schema, &self.spec, &text)?);
        }
        rows.retain(|r| r.date >= first && r.date <= last);
        Ok(rows)
    }
}

impl FillProvider for AnnualCsvFeed {
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError> {
        let start = NaiveDate::from_ymd_opt(self.first_year, 1, 1)
            .ok_or_else(|| UpdateError::Config(format!("bad first_year {}", self.first_year)))?;
        self.fetch_window(start, self.today)
    }

    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        self.fetch_window(first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::Value;

    fn test_env() -> Env {
        Env::new(AppConfig::default()).with_today(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap())
    }

    #[test]
    fn catalogue_names_are_distinct_per_platform() {
        let env = test_env();
        let cftc_sources = cftc(&env).sources();
        let ice_sources = ice(&env).sources();
        assert_eq!(cftc_sources[0].name, CFTC_FUTURES_ONLY);
        assert_eq!(ice_sources[0].name, ICE_FUTURES_ONLY);
    }

    #[test]
    fn flavor_donates_cot_atoms() {
        let env = test_env();
        let config = cftc(&env).source_config(CFTC_FUTURES_ONLY).unwrap();
        assert_eq!(
            config.atoms,
            vec!["OI", "NCL", "NCS", "NCSp", "CL", "CS", "NRL", "NRS"]
        );
    }

    fn cftc_spec(market: &str) -> CsvSpec {
        CsvSpec {
            date_column: "As of Date in Form YYYY-MM-DD".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec![
                "Open Interest (All)".into(),
                "Noncommercial Positions-Long (All)".into(),
                "Noncommercial Positions-Short (All)".into(),
                "Noncommercial Positions-Spreading (All)".into(),
                "Commercial Positions-Long (All)".into(),
                "Commercial Positions-Short (All)".into(),
                "Nonreportable Positions-Long (All)".into(),
                "Nonreportable Positions-Short (All)".into(),
            ],
            select: Some(("Market and Exchange Names".into(), market.into())),
        }
    }

    // Real annual files interleave every market the publisher covers.
    const TWO_MARKET_REPORT: &str = "\
Market and Exchange Names,As of Date in Form YYYY-MM-DD,Open Interest (All),Noncommercial Positions-Long (All),Noncommercial Positions-Short (All),Noncommercial Positions-Spreading (All),Commercial Positions-Long (All),Commercial Positions-Short (All),Nonreportable Positions-Long (All),Nonreportable Positions-Short (All)
GOLD - COMMODITY EXCHANGE INC.,2020-01-07,786166,353517,61073,77215,296199,628287,59235,19591
SILVER - COMMODITY EXCHANGE INC.,2020-01-07,205678,92441,25110,31002,71233,151877,10992,6890
GOLD - COMMODITY EXCHANGE INC.,2020-01-14,790001,355102,60118,78444,297310,630020,59990,19822
";

    #[test]
    fn parses_a_cftc_style_report() {
        let rows =
            parse_csv_rows(&schema(), &cftc_spec("GOLD - COMMODITY EXCHANGE INC."), TWO_MARKET_REPORT)
                .unwrap();
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 7).unwrap());
        assert_eq!(rows[0].values[0], Value::Int(786166));
        assert_eq!(rows[0].values[5], Value::Int(628287));
    }

    #[test]
    fn only_the_configured_market_survives_a_multi_market_file() {
        let rows =
            parse_csv_rows(&schema(), &cftc_spec("GOLD - COMMODITY EXCHANGE INC."), TWO_MARKET_REPORT)
                .unwrap();

        // The silver row sharing 2020-01-07 is dropped, never interleaved
        assert_eq!(rows.len(), 2);
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let mut deduped = dates.clone();
        deduped.dedup();
        assert_eq!(dates, deduped);
        assert!(rows.iter().all(|r| r.values[0] != Value::Int(205678)));

        let silver =
            parse_csv_rows(&schema(), &cftc_spec("SILVER - COMMODITY EXCHANGE INC."), TWO_MARKET_REPORT)
                .unwrap();
        assert_eq!(silver.len(), 1);
        assert_eq!(silver[0].values[0], Value::Int(205678));
    }

    #[test]
    fn default_configs_select_a_market() {
        let env = test_env();
        assert!(!env.config().cftc.market.is_empty());
        assert!(!env.config().ice.market.is_empty());
        assert_ne!(env.config().cftc.market_column, env.config().ice.market_column);
    }
}
