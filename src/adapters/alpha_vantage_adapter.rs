//! Alpha Vantage daily series adapter.
//!
//! Requests `TIME_SERIES_DAILY_ADJUSTED` and falls back once to
//! `TIME_SERIES_DAILY` when the payload is garbled or carries no time series
//! (free keys are often refused the adjusted function).

use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, ProbeReport};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;

pub const SOURCE_NAME: &str = "alphavantage";
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";
pub const DEFAULT_LISTING_LIMIT: usize = 20;
pub const LISTING_EXCHANGES: [&str; 2] = ["NYSE", "NASDAQ"];

const ADJUSTED_FUNCTION: &str = "TIME_SERIES_DAILY_ADJUSTED";
const PLAIN_FUNCTION: &str = "TIME_SERIES_DAILY";
const LISTING_FUNCTION: &str = "LISTING_STATUS";
const TIME_SERIES_MARKER: &str = "Time Series";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    /// Latest ~100 bars.
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            other => Err(format!("unknown output size '{}'", other)),
        }
    }
}

pub struct AlphaVantageAdapter {
    api_key: String,
    output_size: OutputSize,
    base_url: String,
    listing_limit: usize,
    client: Client,
}

impl AlphaVantageAdapter {
    pub fn new(
        api_key: String,
        output_size: OutputSize,
        timeout: Duration,
    ) -> Result<Self, TrendRankError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrendRankError::Network {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            api_key,
            output_size,
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_limit: DEFAULT_LISTING_LIMIT,
            client,
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendRankError> {
        let api_key = config.get_non_empty("source", "api_key").unwrap_or_default();
        let output_size = match config.get_non_empty("source", "output_size") {
            Some(s) => s.parse().map_err(|reason| TrendRankError::ConfigInvalid {
                section: "source".into(),
                key: "output_size".into(),
                reason,
            })?,
            None => OutputSize::Compact,
        };
        let timeout = config.get_int("source", "timeout_secs", 20).max(1) as u64;
        let listing_limit = config
            .get_int("source", "listing_limit", DEFAULT_LISTING_LIMIT as i64)
            .max(1) as usize;

        let mut adapter = Self::new(api_key, output_size, Duration::from_secs(timeout))?;
        if let Some(url) = config.get_non_empty("source", "base_url") {
            adapter = adapter.with_base_url(url);
        }
        Ok(adapter.with_listing_limit(listing_limit))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_listing_limit(mut self, limit: usize) -> Self {
        self.listing_limit = limit;
        self
    }

    fn request(&self, params: &[(&str, &str)]) -> Result<String, TrendRankError> {
        log::debug!("GET {} {:?}", self.base_url, params);

        let mut query = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TrendRankError::Network {
                reason: format!("HTTP request failed: {}", e),
            })?;

        response.text().map_err(|e| TrendRankError::Network {
            reason: format!("failed to read response: {}", e),
        })
    }

    fn fetch_daily(&self, function: &str, symbol: &str) -> Result<Value, TrendRankError> {
        let text = self.request(&[
            ("function", function),
            ("symbol", symbol),
            ("outputsize", self.output_size.as_str()),
        ])?;
        decode_daily(function, &text)
    }
}

/// A daily payload that carries a time series, or `Decode` when the body is
/// not JSON or has no series (rate-limit notes included).
pub fn decode_daily(function: &str, text: &str) -> Result<Value, TrendRankError> {
    let payload: Value = serde_json::from_str(text).map_err(|e| TrendRankError::Decode {
        reason: format!("JSON parse error: {}", e),
    })?;
    if time_series_key(&payload).is_none() {
        return Err(TrendRankError::Decode {
            reason: format!("no time series in {} response", function),
        });
    }
    Ok(payload)
}

/// Try the adjusted function, then the plain one once if the adjusted
/// payload could not be decoded. Transport errors are not retried. Every
/// failure surfaces as `NotFound`.
pub fn fetch_with_fallback<F>(symbol: &str, mut fetch: F) -> Result<Value, TrendRankError>
where
    F: FnMut(&str) -> Result<Value, TrendRankError>,
{
    match fetch(ADJUSTED_FUNCTION) {
        Ok(payload) => Ok(payload),
        Err(TrendRankError::Decode { reason }) => {
            log::warn!("{}: {}; retrying with {}", symbol, reason, PLAIN_FUNCTION);
            fetch(PLAIN_FUNCTION).map_err(|e| {
                log::warn!("{}: {}", symbol, e);
                TrendRankError::not_found(symbol, SOURCE_NAME)
            })
        }
        Err(e) => {
            log::warn!("{}: {}", symbol, e);
            Err(TrendRankError::not_found(symbol, SOURCE_NAME))
        }
    }
}

/// First top-level key whose name contains "Time Series" and maps to an object.
pub fn time_series_key(payload: &Value) -> Option<&str> {
    payload.as_object()?.iter().find_map(|(k, v)| {
        (k.contains(TIME_SERIES_MARKER) && v.is_object()).then_some(k.as_str())
    })
}

/// Parse a daily time-series payload into an ascending series. Entries that
/// fail to parse are skipped.
pub fn parse_time_series(symbol: &str, payload: &Value) -> Result<TimeSeries, TrendRankError> {
    let series = time_series_key(payload)
        .and_then(|key| payload.get(key))
        .and_then(Value::as_object)
        .ok_or_else(|| TrendRankError::not_found(symbol, SOURCE_NAME))?;

    let bars: Vec<OhlcvBar> = series
        .iter()
        .filter_map(|(date, row)| {
            let bar = parse_entry(date, row.as_object()?);
            if bar.is_none() {
                log::trace!("{}: skipping malformed entry {}", symbol, date);
            }
            bar
        })
        .collect();

    if bars.is_empty() {
        return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
    }
    Ok(TimeSeries::new(symbol, bars))
}

fn parse_entry(date: &str, row: &Map<String, Value>) -> Option<OhlcvBar> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let field = |name: &str| row.get(name).and_then(number).filter(|v| v.is_finite());

    // "6. volume" in the adjusted series, "5. volume" in the plain one.
    let volume = match row.get("6. volume").or_else(|| row.get("5. volume")) {
        Some(v) => {
            let v = number(v).filter(|v| v.is_finite() && *v >= 0.0)?;
            v.trunc() as u64
        }
        None => 0,
    };

    Some(OhlcvBar {
        date,
        open: field("1. open")?,
        high: field("2. high")?,
        low: field("3. low")?,
        close: field("4. close")?,
        volume,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

/// Filter a `LISTING_STATUS` CSV down to symbols with a matching status on
/// one of the allowed exchanges, capped at `max`.
pub fn parse_listing(csv_text: &str, state: &str, exchanges: &[&str], max: usize) -> Vec<String> {
    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    let Ok(headers) = rdr.headers().cloned() else {
        return Vec::new();
    };
    let col = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (Some(sym_idx), exch_idx, status_idx) = (col("symbol"), col("exchange"), col("status"))
    else {
        return Vec::new();
    };

    let mut symbols = Vec::new();
    for record in rdr.records().flatten() {
        if symbols.len() >= max {
            break;
        }
        let symbol = record.get(sym_idx).unwrap_or("").trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        let status = status_idx
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if !state.is_empty() && !status.is_empty() && status != state {
            continue;
        }
        if !exchanges.is_empty() {
            let exchange = exch_idx.and_then(|i| record.get(i)).unwrap_or("").trim();
            if !exchanges.iter().any(|e| e.eq_ignore_ascii_case(exchange)) {
                continue;
            }
        }
        symbols.push(symbol);
    }
    symbols
}

/// Classify a raw response body the way a human would read it.
pub fn diagnose_response(text: &str) -> ProbeReport {
    let payload: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let raw: String = text.chars().take(200).collect();
            return ProbeReport::error("Non-JSON response (possible network/proxy)").with_detail(raw);
        }
    };

    let Some(object) = payload.as_object() else {
        return ProbeReport::error("Unexpected API response").with_detail("(non-object)");
    };

    for (label, fallback) in [
        ("note", "Rate limit / Note from API"),
        ("error message", "Error from API"),
        ("information", "Information from API"),
        ("message", "Message from API"),
    ] {
        if let Some((_, v)) = object.iter().find(|(k, _)| k.eq_ignore_ascii_case(label)) {
            let message = v.as_str().unwrap_or(fallback);
            return ProbeReport::error(message);
        }
    }

    if let Some(key) = time_series_key(&payload) {
        let bars = object
            .get(key)
            .and_then(Value::as_object)
            .map_or(0, Map::len);
        return ProbeReport::ok(format!("Received {} bars", bars)).with_detail(key);
    }

    let keys: Vec<&str> = object.keys().take(6).map(String::as_str).collect();
    ProbeReport::error("Unexpected API response").with_detail(format!("keys: {}", keys.join(", ")))
}

impl DataPort for AlphaVantageAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        if self.api_key.is_empty() {
            log::warn!("{}: no Alpha Vantage API key configured", symbol);
            return Err(TrendRankError::not_found(symbol, SOURCE_NAME));
        }

        let payload = fetch_with_fallback(symbol, |function| self.fetch_daily(function, symbol))?;
        parse_time_series(symbol, &payload)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        if self.api_key.is_empty() {
            return Ok(Vec::new());
        }
        let result = self.request(&[
            ("function", LISTING_FUNCTION),
            ("state", "active"),
            ("datatype", "csv"),
        ]);
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                log::warn!("symbol listing unavailable: {}", e);
                return Ok(Vec::new());
            }
        };
        Ok(parse_listing(&text, "active", &LISTING_EXCHANGES, self.listing_limit))
    }

    fn probe(&self, symbol: &str) -> ProbeReport {
        let result = self.request(&[
            ("function", ADJUSTED_FUNCTION),
            ("symbol", symbol),
            ("outputsize", self.output_size.as_str()),
        ]);
        match result {
            Ok(text) => diagnose_response(&text),
            Err(e) => ProbeReport::error(format!("Network/parse error: {}", e)),
        }
    }
}
