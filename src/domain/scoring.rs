//! Scoring and BUY / DON'T BUY decision.
//!
//! Score terms:
//! - last crossover: bull `+2 + 10/recency`, bear `-1 - 10/recency`, where
//!   recency is 10 for events within the last 10 samples, else the distance
//!   from the end (at least 1)
//! - `+0.05 * dist_slow_pct`
//! - `+10 * fast_slope`
//!
//! Undefined features contribute nothing.

use crate::domain::crossover::Polarity;
use crate::domain::features::FeatureSet;
use serde::Serialize;
use std::fmt;

pub const RECENT_EVENT_WINDOW: usize = 10;
pub const BUY_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "DON'T BUY")]
    DontBuy,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Buy => write!(f, "BUY"),
            Decision::DontBuy => write!(f, "DON'T BUY"),
        }
    }
}

pub fn recency(event_index: usize, series_len: usize) -> usize {
    if event_index + RECENT_EVENT_WINDOW >= series_len {
        RECENT_EVENT_WINDOW
    } else {
        (series_len - event_index).max(1)
    }
}

pub fn score(features: &FeatureSet) -> f64 {
    let mut score = 0.0;

    if let Some(event) = features.last_event() {
        let recency = recency(event.index, features.series_len) as f64;
        match event.polarity {
            Polarity::Bull => score += 2.0 + 10.0 / recency,
            Polarity::Bear => score -= 1.0 + 10.0 / recency,
        }
    }

    if let Some(dist) = features.dist_slow_pct {
        score += 0.05 * dist;
    }

    if let Some(slope) = features.fast_slope {
        score += 10.0 * slope;
    }

    score
}

/// Three independent checks, each contributing one reason in a fixed order.
/// BUY when at least [`BUY_THRESHOLD`] pass.
pub fn decide(features: &FeatureSet) -> (Decision, Vec<String>) {
    let checks = [
        (
            features.last_signal == Some(Polarity::Bull),
            "Recent bullish crossover",
            "Last signal not bullish",
        ),
        (
            features.dist_slow_pct.is_some_and(|d| d >= 0.0),
            "Price above slow SMA",
            "Price not above slow SMA",
        ),
        (
            features.fast_slope.is_some_and(|s| s > 0.0),
            "Fast SMA trending up",
            "Fast SMA not trending up",
        ),
    ];

    let passed = checks.iter().filter(|(ok, _, _)| *ok).count();
    let reasons = checks
        .iter()
        .map(|(ok, pass, fail)| if *ok { pass.to_string() } else { fail.to_string() })
        .collect();

    let decision = if passed >= BUY_THRESHOLD {
        Decision::Buy
    } else {
        Decision::DontBuy
    };
    (decision, reasons)
}
