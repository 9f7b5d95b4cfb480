//! Simple Moving Average.
//!
//! Running sum: add the incoming close, subtract the one leaving the window.
//! Warmup: first (n-1) samples are undefined.

use crate::domain::error::TrendRankError;
use crate::domain::indicator::{check_window, IndicatorSeries, IndicatorType};

pub fn calculate_sma(values: &[f64], period: usize) -> Result<IndicatorSeries, TrendRankError> {
    check_window("sma period", period)?;

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: out,
    })
}
