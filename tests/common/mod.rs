#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Instant;
use trendrank::domain::error::TrendRankError;
pub use trendrank::domain::ohlcv::{OhlcvBar, TimeSeries};
use trendrank::ports::data_port::DataPort;

/// In-memory source that records every adapter call.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<(String, Instant)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_closes(self, symbol: &str, closes: &[f64]) -> Self {
        self.with_bars(symbol, bars_from_closes(closes))
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.borrow().iter().map(|(_, t)| *t).collect()
    }
}

impl DataPort for MockDataPort {
    fn source_name(&self) -> &str {
        "mock"
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        self.calls
            .borrow_mut()
            .push((symbol.to_string(), Instant::now()));

        if let Some(reason) = self.errors.get(symbol) {
            return Err(TrendRankError::Network {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(TimeSeries::new(symbol, bars.clone())),
            _ => Err(TrendRankError::not_found(symbol, "mock")),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// One bar per calendar day from 2023-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2023, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + Duration::days(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 10_000 + i as u64,
        })
        .collect()
}

/// 300 closes: a slow decline for 200 bars, then a steady rise. The 50-bar
/// SMA crosses above the 200-bar SMA at bar 249.
pub fn golden_cross_closes() -> Vec<f64> {
    (0..300)
        .map(|i| {
            if i < 200 {
                150.0 - 0.1 * i as f64
            } else {
                150.0 - 0.1 * 199.0 + 0.3 * (i - 199) as f64
            }
        })
        .collect()
}

pub fn rising_closes(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn falling_closes(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start - step * i as f64).collect()
}

pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
