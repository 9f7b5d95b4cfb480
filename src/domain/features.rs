//! Per-symbol feature extraction for scoring.
//!
//! Features are recomputed on every ranking pass and never cached.

use crate::domain::crossover::{detect_crossovers, CrossoverEvent, Polarity};
use crate::domain::error::TrendRankError;
use crate::domain::indicator::{
    calculate_macd_default, calculate_rsi, calculate_sma, IndicatorSeries,
};
use crate::domain::ohlcv::TimeSeries;

/// Lookback for the fast SMA slope.
pub const SLOPE_WINDOW: usize = 5;
pub const RSI_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub sma_fast: IndicatorSeries,
    pub sma_slow: IndicatorSeries,
    pub events: Vec<CrossoverEvent>,
    pub series_len: usize,
    pub last_close: Option<f64>,
    /// Percentage distance of the last close above (+) or below (-) the slow SMA.
    pub dist_slow_pct: Option<f64>,
    pub fast_slope: Option<f64>,
    pub last_signal: Option<Polarity>,
    pub rsi_last: Option<f64>,
    pub macd_histogram_last: Option<f64>,
}

impl FeatureSet {
    pub fn last_event(&self) -> Option<&CrossoverEvent> {
        self.events.last()
    }
}

pub fn evaluate_series(
    series: &TimeSeries,
    fast: usize,
    slow: usize,
) -> Result<FeatureSet, TrendRankError> {
    let closes = series.closes();
    let sma_fast = calculate_sma(&closes, fast)?;
    let sma_slow = calculate_sma(&closes, slow)?;
    let events = detect_crossovers(&sma_fast.values, &sma_slow.values);
    let last_signal = events.last().map(|e| e.polarity);

    let last_close = closes.last().copied();
    let dist_slow_pct = match (last_close, sma_slow.last()) {
        (Some(close), Some(slow_value)) if slow_value != 0.0 => {
            Some((close - slow_value) / slow_value * 100.0)
        }
        _ => None,
    };

    let fast_slope = slope(&sma_fast, SLOPE_WINDOW);
    let rsi_last = calculate_rsi(&closes, RSI_PERIOD)?.last();
    let macd_histogram_last = calculate_macd_default(&closes)?.histogram.last();

    Ok(FeatureSet {
        sma_fast,
        sma_slow,
        events,
        series_len: closes.len(),
        last_close,
        dist_slow_pct,
        fast_slope,
        last_signal,
        rsi_last,
        macd_histogram_last,
    })
}

/// `(s[last] - s[last - window]) / window`, when both endpoints are defined.
fn slope(series: &IndicatorSeries, window: usize) -> Option<f64> {
    let last = series.len().checked_sub(1)?;
    let start = last.checked_sub(window)?;
    let end_value = series.get(last)?;
    let start_value = series.get(start)?;
    Some((end_value - start_value) / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_series(closes: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect();
        TimeSeries::new("TEST", bars)
    }

    #[test]
    fn slope_over_window() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * i as f64).collect();
        let features = evaluate_series(&make_series(&closes), 3, 10).unwrap();
        // SMA(3) of a line with slope 2 rises 2 per sample.
        assert_relative_eq!(features.fast_slope.unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn slope_undefined_without_history() {
        // fast SMA(3) defined from index 2; last index 6 needs index 1.
        let closes: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let features = evaluate_series(&make_series(&closes), 3, 5).unwrap();
        assert_eq!(features.fast_slope, None);

        let closes: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let features = evaluate_series(&make_series(&closes), 3, 5).unwrap();
        assert!(features.fast_slope.is_some());
    }

    #[test]
    fn distance_from_slow_sma() {
        // SMA(4) of [10,10,10,14] = 11 ; (14 - 11) / 11 * 100
        let features = evaluate_series(&make_series(&[10.0, 10.0, 10.0, 14.0]), 2, 4).unwrap();
        assert_relative_eq!(features.dist_slow_pct.unwrap(), 3.0 / 11.0 * 100.0);
        assert_eq!(features.last_close, Some(14.0));
    }

    #[test]
    fn distance_undefined_when_slow_sma_zero() {
        let features = evaluate_series(&make_series(&[0.0, 0.0, 0.0]), 1, 2).unwrap();
        assert_eq!(features.dist_slow_pct, None);
    }

    #[test]
    fn short_series_has_no_slow_features() {
        let features = evaluate_series(&make_series(&[10.0, 11.0, 12.0]), 50, 200).unwrap();
        assert_eq!(features.dist_slow_pct, None);
        assert_eq!(features.fast_slope, None);
        assert!(features.events.is_empty());
        assert_eq!(features.last_signal, None);
        assert_eq!(features.series_len, 3);
    }

    #[test]
    fn last_signal_follows_last_event() {
        let mut closes = vec![10.0; 10];
        closes.extend([20.0, 30.0, 40.0]);
        let features = evaluate_series(&make_series(&closes), 2, 5).unwrap();
        assert_eq!(features.last_signal, Some(Polarity::Bull));
        assert_eq!(features.last_event().unwrap().polarity, Polarity::Bull);
    }

    #[test]
    fn empty_series() {
        let features = evaluate_series(&make_series(&[]), 50, 200).unwrap();
        assert_eq!(features.last_close, None);
        assert_eq!(features.rsi_last, None);
        assert_eq!(features.macd_histogram_last, None);
    }

    #[test]
    fn zero_window_rejected() {
        assert!(evaluate_series(&make_series(&[1.0]), 0, 200).is_err());
        assert!(evaluate_series(&make_series(&[1.0]), 50, 0).is_err());
    }
}
