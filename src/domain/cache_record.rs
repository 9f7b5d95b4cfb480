//! Durable cache record for one (source, symbol) time series.
//!
//! Encoded as JSON; bar dates are written as ISO `YYYY-MM-DD` strings.

use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub symbol: String,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub bars: Vec<OhlcvBar>,
}

impl CacheRecord {
    pub fn from_series(source: &str, series: &TimeSeries, fetched_at: DateTime<Utc>) -> Self {
        Self {
            symbol: series.symbol().to_string(),
            source: source.to_string(),
            fetched_at,
            bars: series.bars().to_vec(),
        }
    }

    pub fn into_series(self) -> TimeSeries {
        TimeSeries::new(self.symbol, self.bars)
    }

    /// Fresh while `0 <= now - fetched_at <= ttl`. A record stamped in the
    /// future is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age >= Duration::zero() && age <= ttl
    }

    pub fn matches(&self, source: &str, symbol: &str) -> bool {
        self.source == source && self.symbol == symbol
    }

    pub fn encode(&self) -> Result<Vec<u8>, TrendRankError> {
        serde_json::to_vec(self).map_err(|e| TrendRankError::Decode {
            reason: format!("failed to encode cache record: {}", e),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TrendRankError> {
        serde_json::from_slice(bytes).map_err(|e| TrendRankError::Decode {
            reason: format!("failed to decode cache record: {}", e),
        })
    }
}
