//! RSI (Relative Strength Index).
//!
//! Keeps running sums of gains and losses over the trailing n price deltas,
//! updated incrementally as deltas enter and leave the window.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n samples are undefined (need n price deltas).

use crate::domain::error::TrendRankError;
use crate::domain::indicator::{check_window, IndicatorSeries, IndicatorType};

/// Sum of one side (gains or losses) of the window. The count of non-zero
/// members lets the sum snap back to exactly 0.0 once they have all left,
/// instead of keeping floating-point residue from the subtractions.
#[derive(Default)]
struct WindowSum {
    sum: f64,
    count: usize,
}

impl WindowSum {
    fn add(&mut self, amount: f64) {
        if amount > 0.0 {
            self.sum += amount;
            self.count += 1;
        }
    }

    fn remove(&mut self, amount: f64) {
        if amount > 0.0 {
            self.sum -= amount;
            self.count -= 1;
        }
        if self.count == 0 {
            self.sum = 0.0;
        } else if self.sum < 0.0 {
            self.sum = 0.0;
        }
    }
}

pub fn calculate_rsi(values: &[f64], period: usize) -> Result<IndicatorSeries, TrendRankError> {
    check_window("rsi period", period)?;

    let mut out = vec![None; values.len()];
    let mut gains = WindowSum::default();
    let mut losses = WindowSum::default();

    for i in 1..values.len() {
        let change = values[i] - values[i - 1];
        gains.add(change);
        losses.add(-change);

        if i > period {
            let old = values[i - period] - values[i - period - 1];
            gains.remove(old);
            losses.remove(-old);
        }

        if i >= period {
            let avg_gain = gains.sum / period as f64;
            let avg_loss = losses.sum / period as f64;
            out[i] = Some(if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
            });
        }
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values: out,
    })
}
