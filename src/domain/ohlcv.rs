//! OHLCV bar and per-symbol time series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    /// All four prices are finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Daily history for exactly one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl TimeSeries {
    /// Drops bars with a non-finite price, sorts by date and keeps the first
    /// bar for any repeated date.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.retain(OhlcvBar::is_finite);
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<OhlcvBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn new_sorts_by_date() {
        let series = TimeSeries::new(
            "BHP",
            vec![bar("2024-01-03", 3.0), bar("2024-01-01", 1.0), bar("2024-01-02", 2.0)],
        );
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            series.first_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            series.last_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
    }

    #[test]
    fn new_drops_duplicate_dates() {
        let series = TimeSeries::new(
            "BHP",
            vec![bar("2024-01-01", 1.0), bar("2024-01-02", 2.0), bar("2024-01-02", 9.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.0, 2.0]);
        assert!(series.bars().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn new_drops_non_finite_bars() {
        let mut bad = bar("2024-01-02", 2.0);
        bad.high = f64::NAN;
        let mut worse = bar("2024-01-03", 3.0);
        worse.close = f64::INFINITY;

        let series = TimeSeries::new("BHP", vec![bar("2024-01-01", 1.0), bad, worse]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.closes(), vec![1.0]);
        assert!(series.bars().iter().all(OhlcvBar::is_finite));
    }

    #[test]
    fn empty_series() {
        let series = TimeSeries::new("X", vec![]);
        assert!(series.is_empty());
        assert_eq!(series.first_date(), None);
        assert!(series.closes().is_empty());
    }

    #[test]
    fn non_finite_bar_detected() {
        let mut b = bar("2024-01-01", 10.0);
        assert!(b.is_finite());
        b.high = f64::NAN;
        assert!(!b.is_finite());
    }
}
