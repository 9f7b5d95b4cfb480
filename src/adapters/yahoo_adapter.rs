//! Yahoo Finance chart API adapter.
//!
//! No API key required. The chart endpoint is tried against two hosts; the
//! response carries parallel `timestamp` and quote arrays with `null` holes.

use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, ProbeReport};
use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

pub const SOURCE_NAME: &str = "yahoo";
pub const DEFAULT_HOSTS: [&str; 2] = ["query1.finance.yahoo.com", "query2.finance.yahoo.com"];
pub const DEFAULT_RANGE: &str = "1y";
pub const MAX_RANGE: &str = "max";
const INTERVAL: &str = "1d";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

pub struct YahooAdapter {
    client: Client,
    hosts: Vec<String>,
    range: String,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Option<Chart>,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Option<Vec<Quote>>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

impl ChartEnvelope {
    fn error_message(&self) -> Option<String> {
        let error = self.chart.as_ref()?.error.as_ref()?;
        if error.is_null() {
            return None;
        }
        Some(
            error
                .get("description")
                .and_then(|d| d.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        )
    }

    fn first_result(&self) -> Option<&ChartResult> {
        self.chart.as_ref()?.result.as_ref()?.first()
    }
}

impl YahooAdapter {
    pub fn new(timeout: Duration) -> Result<Self, TrendRankError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrendRankError::Network {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            range: DEFAULT_RANGE.to_string(),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendRankError> {
        let timeout = config.get_int("source", "timeout_secs", 20).max(1) as u64;
        let mut adapter = Self::new(Duration::from_secs(timeout))?;
        if let Some(range) = config.get_non_empty("source", "range") {
            adapter = adapter.with_range(range);
        }
        Ok(adapter)
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    fn fetch_text(&self, host: &str, symbol: &str, range: &str) -> Result<String, TrendRankError> {
        let url = format!("https://{}/v8/finance/chart/{}", host, symbol);
        log::debug!("GET {} range={}", url, range);

        let response = self
            .client
            .get(&url)
            .query(&[("interval", INTERVAL), ("range", range)])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TrendRankError::Network {
                reason: format!("HTTP request to {} failed: {}", host, e),
            })?;

        response.text().map_err(|e| TrendRankError::Network {
            reason: format!("failed to read response from {}: {}", host, e),
        })
    }

    fn fetch_range(&self, symbol: &str, range: &str) -> Result<Vec<OhlcvBar>, TrendRankError> {
        first_host_ok(symbol, &self.hosts, |host| {
            self.fetch_text(host, symbol, range)
                .and_then(|text| parse_chart(&text))
        })
    }
}

/// Try each host in order and return the first success. A host that fails
/// or answers with a chart error moves on to the next; the last error wins.
fn first_host_ok<T, F>(symbol: &str, hosts: &[String], mut fetch: F) -> Result<T, TrendRankError>
where
    F: FnMut(&str) -> Result<T, TrendRankError>,
{
    let mut last_error = TrendRankError::Network {
        reason: "no hosts configured".into(),
    };
    for host in hosts {
        match fetch(host) {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!("{}: {} failed: {}", symbol, host, e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// Fetch `range`, and once more with `range=max` when that produced no bars.
fn fetch_with_max_retry<F>(symbol: &str, range: &str, mut fetch: F) -> Result<Vec<OhlcvBar>, TrendRankError>
where
    F: FnMut(&str) -> Result<Vec<OhlcvBar>, TrendRankError>,
{
    let bars = fetch(range)?;
    if !bars.is_empty() || range == MAX_RANGE {
        return Ok(bars);
    }
    log::warn!("{}: no bars for range {}, retrying with {}", symbol, range, MAX_RANGE);
    fetch(MAX_RANGE)
}

/// Zip the parallel arrays into bars. Bars without a close are skipped;
/// missing open/high/low take that bar's close and missing volume is 0.
fn bars_from_result(result: &ChartResult) -> Vec<OhlcvBar> {
    let timestamps = result.timestamp.as_deref().unwrap_or_default();
    let quote = result
        .indicators
        .as_ref()
        .and_then(|i| i.quote.as_ref())
        .and_then(|q| q.first());
    let Some(quote) = quote else {
        return Vec::new();
    };

    let at = |column: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
        column
            .as_ref()
            .and_then(|c| c.get(i).copied().flatten())
            .filter(|v| v.is_finite())
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = timestamp_to_date(ts)?;
            let close = at(&quote.close, i)?;
            let volume = at(&quote.volume, i)
                .filter(|v| *v >= 0.0)
                .map_or(0, |v| v.trunc() as u64);
            Some(OhlcvBar {
                date,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume,
            })
        })
        .collect()
}

fn timestamp_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

fn parse_envelope(text: &str) -> Result<ChartEnvelope, TrendRankError> {
    serde_json::from_str(text).map_err(|e| TrendRankError::Decode {
        reason: format!("JSON parse error: {}", e),
    })
}

/// Parse a chart response body into bars. A chart error or an empty result
/// array is a `Decode` error.
pub fn parse_chart(text: &str) -> Result<Vec<OhlcvBar>, TrendRankError> {
    let envelope = parse_envelope(text)?;
    if let Some(message) = envelope.error_message() {
        return Err(TrendRankError::Decode { reason: message });
    }
    let result = envelope.first_result().ok_or_else(|| TrendRankError::Decode {
        reason: "empty chart result".into(),
    })?;
    Ok(bars_from_result(result))
}

impl DataPort for YahooAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        let not_found = |e: TrendRankError| {
            log::info!("{}: {}", symbol, e);
            TrendRankError::not_found(symbol, SOURCE_NAME)
        };

        let bars = fetch_with_max_retry(symbol, &self.range, |range| self.fetch_range(symbol, range))
            .map_err(not_found)?;
        if bars.is_empty() {
            return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
        }
        Ok(TimeSeries::new(symbol, bars))
    }

    fn probe(&self, symbol: &str) -> ProbeReport {
        let mut tried = Vec::new();
        let mut envelope = None;
        for host in &self.hosts {
            tried.push(host.as_str());
            let parsed = self
                .fetch_text(host, symbol, &self.range)
                .and_then(|text| parse_envelope(&text));
            if let Ok(e) = parsed {
                envelope = Some(e);
                break;
            }
        }
        let hosts = tried.join(", ");

        let Some(envelope) = envelope else {
            return ProbeReport::error("No response (network/blocked)").with_detail(hosts);
        };
        if envelope.chart.is_none() {
            return ProbeReport::error("Missing chart key").with_detail(hosts);
        }
        if let Some(message) = envelope.error_message() {
            return ProbeReport::error(message).with_detail(hosts);
        }
        match envelope.first_result() {
            None => ProbeReport::error("Empty result array").with_detail(hosts),
            Some(result) => {
                let count = result.timestamp.as_ref().map_or(0, Vec::len);
                ProbeReport::ok(format!("Received {} bars", count)).with_detail(hosts)
            }
        }
    }
}
