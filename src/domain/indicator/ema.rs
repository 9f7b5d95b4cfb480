//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Defined from the first sample.

use crate::domain::error::TrendRankError;
use crate::domain::indicator::{check_window, IndicatorSeries, IndicatorType};

pub fn calculate_ema(values: &[f64], period: usize) -> Result<IndicatorSeries, TrendRankError> {
    check_window("ema period", period)?;

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: ema_over(values.iter().map(|&v| Some(v)), period),
    })
}

/// EMA over a sequence with gaps: undefined inputs carry the previous EMA
/// forward, and the first defined input seeds it.
pub(crate) fn ema_over<I>(values: I, period: usize) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let k = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    values
        .into_iter()
        .map(|v| {
            if let Some(v) = v {
                prev = Some(match prev {
                    None => v,
                    Some(p) => v * k + p * (1.0 - k),
                });
            }
            prev
        })
        .collect()
}
