//! Moving-average crossover detection.
//!
//! diff = fast - slow wherever both are defined. With `prev` the last defined
//! diff: `prev <= 0 && diff > 0` is bullish, `prev >= 0 && diff < 0` is
//! bearish. A zero diff counts toward both sides, so a flat-then-rising
//! sequence fires once, on the first strictly positive diff. Undefined
//! samples are skipped without resetting `prev`.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Bull,
    Bear,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Bull => write!(f, "bull"),
            Polarity::Bear => write!(f, "bear"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossoverEvent {
    pub index: usize,
    pub polarity: Polarity,
}

pub fn detect_crossovers(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<CrossoverEvent> {
    let mut events = Vec::new();
    let mut prev_diff: Option<f64> = None;

    for (index, (f, s)) in fast.iter().zip(slow).enumerate() {
        let (Some(f), Some(s)) = (f, s) else {
            continue;
        };
        let diff = f - s;

        if let Some(prev) = prev_diff {
            if prev <= 0.0 && diff > 0.0 {
                events.push(CrossoverEvent {
                    index,
                    polarity: Polarity::Bull,
                });
            } else if prev >= 0.0 && diff < 0.0 {
                events.push(CrossoverEvent {
                    index,
                    polarity: Polarity::Bear,
                });
            }
        }
        prev_diff = Some(diff);
    }

    events
}
