//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line; where the line is undefined the
//! previous signal value is carried forward unchanged.
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9

use crate::domain::error::TrendRankError;
use crate::domain::indicator::ema::ema_over;
use crate::domain::indicator::{calculate_ema, check_window, IndicatorSeries, IndicatorType};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

pub fn calculate_macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<MacdSeries, TrendRankError> {
    check_window("macd fast", fast)?;
    check_window("macd slow", slow)?;
    check_window("macd signal", signal_period)?;

    let ema_fast = calculate_ema(values, fast)?;
    let ema_slow = calculate_ema(values, slow)?;

    let line: Vec<Option<f64>> = ema_fast
        .values
        .iter()
        .zip(&ema_slow.values)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal = ema_over(line.iter().copied(), signal_period);

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    Ok(MacdSeries {
        line: IndicatorSeries {
            indicator_type: IndicatorType::MacdLine { fast, slow },
            values: line,
        },
        signal: IndicatorSeries {
            indicator_type: IndicatorType::MacdSignal {
                fast,
                slow,
                signal: signal_period,
            },
            values: signal,
        },
        histogram: IndicatorSeries {
            indicator_type: IndicatorType::MacdHistogram {
                fast,
                slow,
                signal: signal_period,
            },
            values: histogram,
        },
    })
}

pub fn calculate_macd_default(values: &[f64]) -> Result<MacdSeries, TrendRankError> {
    calculate_macd(values, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
