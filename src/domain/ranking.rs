//! Ranking pipeline: load, evaluate, score, sort.

use crate::domain::crossover::Polarity;
use crate::domain::error::TrendRankError;
use crate::domain::features::evaluate_series;
use crate::domain::ohlcv::TimeSeries;
use crate::domain::scoring::{decide, score, Decision};
use crate::domain::settings::{DEFAULT_FAST, DEFAULT_SLOW};
use crate::ports::data_port::DataPort;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    pub fast: usize,
    pub slow: usize,
    /// Keep at most this many results after sorting and filtering.
    pub top: Option<usize>,
    /// Keep only BUY results.
    pub decision_only: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            top: None,
            decision_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub symbol: String,
    pub score: f64,
    pub decision: Decision,
    pub reasons: Vec<String>,
    pub last_close: Option<f64>,
    pub dist_slow_pct: Option<f64>,
    pub fast_slope: Option<f64>,
    pub last_signal: Option<Polarity>,
}

/// Score a single already-loaded series.
pub fn rank_series(
    series: &TimeSeries,
    fast: usize,
    slow: usize,
) -> Result<RankedResult, TrendRankError> {
    let features = evaluate_series(series, fast, slow)?;
    let (decision, reasons) = decide(&features);
    Ok(RankedResult {
        symbol: series.symbol().to_string(),
        score: score(&features),
        decision,
        reasons,
        last_close: features.last_close,
        dist_slow_pct: features.dist_slow_pct,
        fast_slope: features.fast_slope,
        last_signal: features.last_signal,
    })
}

/// Rank `symbols` by score, highest first, ties by symbol.
///
/// Symbols without usable data are skipped. Only invalid windows or
/// non-data failures are returned as errors.
pub fn rank(
    data_port: &dyn DataPort,
    symbols: &[String],
    options: &RankOptions,
) -> Result<Vec<RankedResult>, TrendRankError> {
    if options.fast == 0 {
        return Err(TrendRankError::invalid_window("fast", options.fast));
    }
    if options.slow == 0 {
        return Err(TrendRankError::invalid_window("slow", options.slow));
    }

    let mut results = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let series = match data_port.fetch_series(symbol) {
            Ok(series) => series,
            Err(e) if e.is_skippable() => {
                log::info!("skipping {}: {}", symbol, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if series.is_empty() {
            log::info!("skipping {}: empty series", symbol);
            continue;
        }
        results.push(rank_series(&series, options.fast, options.slow)?);
    }

    results.sort_by(compare_results);

    if options.decision_only {
        results.retain(|r| r.decision == Decision::Buy);
    }
    if let Some(top) = options.top {
        results.truncate(top);
    }

    log::info!("ranked {} of {} symbols", results.len(), symbols.len());
    Ok(results)
}

fn compare_results(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.symbol.cmp(&b.symbol))
}
