//! CSV file data adapter.
//!
//! One file per symbol, `<data_dir>/<SYMBOL>.csv`, with a header naming the
//! date/open/high/low/close/volume columns in any order and any case.

use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::PathBuf;

pub const SOURCE_NAME: &str = "csv";
pub const DEFAULT_DATA_DIR: &str = "data";

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Column positions resolved from the header row.
struct ColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let [date, open, high, low, close, volume] = REQUIRED_COLUMNS.map(find);
        Some(Self {
            date: date?,
            open: open?,
            high: high?,
            low: low?,
            close: close?,
            volume: volume?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let dir = config
            .get_non_empty("source", "data_dir")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(PathBuf::from(dir))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Parse CSV content into a series. Malformed rows are skipped; a missing
/// required column or zero valid rows is `NotFound`.
pub fn parse_csv(symbol: &str, content: &str) -> Result<TimeSeries, TrendRankError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|_| TrendRankError::not_found(symbol, SOURCE_NAME))?
        .clone();
    let Some(columns) = ColumnMap::from_headers(&headers) else {
        log::warn!("{}: CSV header lacks a required column", symbol);
        return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
    };

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        match result.ok().and_then(|record| parse_row(&record, &columns)) {
            Some(bar) => bars.push(bar),
            None => log::trace!("{}: skipping malformed row {}", symbol, line + 2),
        }
    }

    if bars.is_empty() {
        return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
    }
    Ok(TimeSeries::new(symbol, bars))
}

fn parse_row(record: &csv::StringRecord, columns: &ColumnMap) -> Option<OhlcvBar> {
    let price = |idx: usize| -> Option<f64> {
        record
            .get(idx)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    };

    let date = NaiveDate::parse_from_str(record.get(columns.date)?.trim(), "%Y-%m-%d").ok()?;
    let open = price(columns.open)?;
    let high = price(columns.high)?;
    let low = price(columns.low)?;
    let close = price(columns.close)?;
    let volume = parse_volume(record.get(columns.volume).unwrap_or(""))?;

    Some(OhlcvBar {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Empty cells are zero volume; fractional values are truncated.
pub(crate) fn parse_volume(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.trunc() as u64)
}

impl DataPort for CsvAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("{}: cannot read {}: {}", symbol, path.display(), e);
                return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
            }
        };
        parse_csv(symbol, &content)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if let (true, Some(stem)) = (is_csv, path.file_stem()) {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
