//! HTTP transport and CSV-to-rows parsing shared by all feeds.
//!
//! Connectivity failures (DNS, connect, timeout) map to the transient error
//! class; everything else — bad status, changed document shape — is fatal
//! for the source. Publishers' CSVs are lenient about missing numeric cells
//! ("." or blank), so numeric parses fall back rather than abort.

use crate::error::UpdateError;
use crate::sources::circuit::CircuitBreaker;
use crate::store::{ColumnType, Row, Schema, Value};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Blocking HTTP client with the transient/fatal error mapping applied.
pub struct HttpFeed {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
}

impl HttpFeed {
    pub fn new() -> Self {
        Self::with_breaker(Arc::new(CircuitBreaker::default_feed()))
    }

    pub fn with_breaker(breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client, breaker }
    }

    pub fn get_text(&self, url: &str) -> Result<String, UpdateError> {
        let resp = self.get(url)?;
        resp.text()
            .map_err(|e| UpdateError::ResponseFormatChanged(format!("body read: {e}")))
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, UpdateError> {
        let resp = self.get(url)?;
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| UpdateError::ResponseFormatChanged(format!("body read: {e}")))
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, UpdateError> {
        if !self.breaker.is_allowed() {
            return Err(UpdateError::CircuitBreakerTripped);
        }

        match self.client.get(url).send() {
            Ok(resp) => {
                let status = resp.status();

                if status == reqwest::StatusCode::FORBIDDEN {
                    // Publisher ban — stop hammering immediately
                    self.breaker.trip();
                    return Err(UpdateError::CircuitBreakerTripped);
                }
                if !status.is_success() {
                    self.breaker.record_failure();
                    return Err(UpdateError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                self.breaker.record_success();
                Ok(resp)
            }
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    self.breaker.record_failure();
                }
                Err(UpdateError::NetworkUnreachable(e.to_string()))
            }
        }
    }
}

impl Default for HttpFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// How a publisher's CSV maps onto a source schema.
#[derive(Debug, Clone)]
pub struct CsvSpec {
    /// Header of the date column.
    pub date_column: String,
    /// chrono format of the date column.
    pub date_format: String,
    /// CSV header for each schema column, in schema order.
    pub columns: Vec<String>,
    /// Keep only records whose named column equals this value. Multi-market
    /// publisher files interleave many markets/contracts per report date;
    /// without a selection the output would carry duplicate dates.
    pub select: Option<(String, String)>,
}

/// Parse a publisher CSV document into rows for the given schema.
pub fn parse_csv_rows(schema: &Schema, spec: &CsvSpec, text: &str) -> Result<Vec<Row>, UpdateError> {
    if spec.columns.len() != schema.width() {
        return Err(UpdateError::Validation(format!(
            "csv spec maps {} columns, schema has {}",
            spec.columns.len(),
            schema.width()
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| UpdateError::ResponseFormatChanged(format!("csv header: {e}")))?
        .clone();

    let header_index = |name: &str| -> Result<usize, UpdateError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                UpdateError::ResponseFormatChanged(format!("missing csv column '{name}'"))
            })
    };

    let date_idx = header_index(&spec.date_column)?;
    let mut value_indices = Vec::with_capacity(spec.columns.len());
    for name in &spec.columns {
        value_indices.push(header_index(name)?);
    }
    let select = match &spec.select {
        Some((column, value)) => Some((header_index(column)?, value.as_str())),
        None => None,
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| UpdateError::ResponseFormatChanged(format!("csv record: {e}")))?;

        if let Some((idx, value)) = select {
            if record.get(idx).unwrap_or("") != value {
                continue;
            }
        }

        let date_text = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(date_text, &spec.date_format).map_err(|e| {
            UpdateError::ResponseFormatChanged(format!("bad date '{date_text}': {e}"))
        })?;

        let mut values = Vec::with_capacity(schema.width());
        for (&idx, (_, ty)) in value_indices.iter().zip(schema.columns()) {
            let cell = record.get(idx).unwrap_or("");
            let value = match ty {
                ColumnType::Float => Value::Float(cell.parse().unwrap_or(f64::NAN)),
                ColumnType::Int => Value::Int(cell.parse().unwrap_or(0)),
                ColumnType::Text => Value::Text(cell.to_string()),
            };
            values.push(value);
        }
        rows.push(Row::new(date, values));
    }

    Ok(rows)
}

/// Substitute `{begin}`/`{end}` placeholders with ISO dates.
pub fn window_url(template: &str, begin: NaiveDate, end: NaiveDate) -> String {
    template
        .replace("{begin}", &begin.format("%Y-%m-%d").to_string())
        .replace("{end}", &end.format("%Y-%m-%d").to_string())
}

/// Generic fill strategy for feeds whose endpoint takes an explicit date
/// window: the initial fill asks for everything since the series start, the
/// incremental fill asks for exactly the missing window.
pub struct WindowCsvFeed {
    feed: HttpFeed,
    url_template: String,
    schema: Schema,
    spec: CsvSpec,
    series_start: NaiveDate,
    today: NaiveDate,
}

impl WindowCsvFeed {
    pub fn new(
        url_template: &str,
        schema: Schema,
        spec: CsvSpec,
        series_start: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        Self {
            feed: HttpFeed::new(),
            url_template: url_template.to_string(),
            schema,
            spec,
            series_start,
            today,
        }
    }

    fn fetch_window(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        let url = window_url(&self.url_template, first, last);
        let text = self.feed.get_text(&url)?;
        let rows = parse_csv_rows(&self.schema, &self.spec, &text)?;
        // Publishers occasionally pad the window; keep only what was asked for
        Ok(rows
            .into_iter()
            .filter(|r| r.date >= first && r.date <= last)
            .collect())
    }
}

impl crate::update::FillProvider for WindowCsvFeed {
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError> {
        self.fetch_window(self.series_start, self.today)
    }

    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError> {
        self.fetch_window(first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_a_fred_style_csv() {
        let schema = Schema::new(&[("MBase", ColumnType::Float)]);
        let spec = CsvSpec {
            date_column: "observation_date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["BOGMBASE".into()],
            select: None,
        };
        let text = "observation_date,BOGMBASE\n2020-01-01,3454.9\n2020-02-01,3466.1\n";

        let rows = parse_csv_rows(&schema, &spec, text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2020, 1, 1));
        assert_eq!(rows[0].values[0], Value::Float(3454.9));
    }

    #[test]
    fn missing_numeric_cells_become_nan_or_zero() {
        let schema = Schema::new(&[("SET", ColumnType::Float), ("VOL", ColumnType::Int)]);
        let spec = CsvSpec {
            date_column: "Date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["SET".into(), "VOL".into()],
            select: None,
        };
        let text = "Date,SET,VOL\n2020-01-01,.,\n";

        let rows = parse_csv_rows(&schema, &spec, text).unwrap();
        assert!(matches!(rows[0].values[0], Value::Float(v) if v.is_nan()));
        assert_eq!(rows[0].values[1], Value::Int(0));
    }

    #[test]
    fn missing_column_is_a_format_change() {
        let schema = Schema::new(&[("MBase", ColumnType::Float)]);
        let spec = CsvSpec {
            date_column: "observation_date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["BOGMBASE".into()],
            select: None,
        };
        let text = "date,value\n2020-01-01,1.0\n";

        assert!(matches!(
            parse_csv_rows(&schema, &spec, text),
            Err(UpdateError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn bad_date_is_a_format_change() {
        let schema = Schema::new(&[("MBase", ColumnType::Float)]);
        let spec = CsvSpec {
            date_column: "observation_date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["BOGMBASE".into()],
            select: None,
        };
        let text = "observation_date,BOGMBASE\nnot-a-date,1.0\n";

        assert!(matches!(
            parse_csv_rows(&schema, &spec, text),
            Err(UpdateError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn select_keeps_only_matching_records() {
        let schema = Schema::new(&[("OI", ColumnType::Int)]);
        let spec = CsvSpec {
            date_column: "Date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["OI".into()],
            select: Some(("Market".into(), "GOLD".into())),
        };
        // Two markets share every report date
        let text = "Market,Date,OI\nGOLD,2020-01-07,786166\nSILVER,2020-01-07,205678\nGOLD,2020-01-14,790001\n";

        let rows = parse_csv_rows(&schema, &spec, text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values[0], Value::Int(786166));
        assert_eq!(rows[1].date, date(2020, 1, 14));
        // One row per date survives the selection
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let mut deduped = dates.clone();
        deduped.dedup();
        assert_eq!(dates, deduped);
    }

    #[test]
    fn select_on_a_missing_column_is_a_format_change() {
        let schema = Schema::new(&[("OI", ColumnType::Int)]);
        let spec = CsvSpec {
            date_column: "Date".into(),
            date_format: "%Y-%m-%d".into(),
            columns: vec!["OI".into()],
            select: Some(("Contract".into(), "GC".into())),
        };
        let text = "Date,OI\n2020-01-07,786166\n";

        assert!(matches!(
            parse_csv_rows(&schema, &spec, text),
            Err(UpdateError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn window_url_substitutes_both_bounds() {
        let url = window_url(
            "https://x/csv?from={begin}&to={end}",
            date(2020, 1, 6),
            date(2020, 1, 10),
        );
        assert_eq!(url, "https://x/csv?from=2020-01-06&to=2020-01-10");
    }
}
