//! Validated runtime settings.
//!
//! Reads the `[source]`, `[cache]` and `[ranking]` sections through
//! [`ConfigPort`] and rejects values the loader or pipeline cannot run with.

use crate::domain::error::TrendRankError;
use crate::domain::ranking::RankOptions;
use crate::ports::config_port::ConfigPort;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_FAST: usize = 50;
pub const DEFAULT_SLOW: usize = 200;
pub const DEFAULT_TTL_HOURS: i64 = 24;
pub const DEFAULT_THROTTLE_MS: i64 = 400;
pub const DEFAULT_TIMEOUT_SECS: i64 = 20;
pub const DEFAULT_CACHE_DIR: &str = ".cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    AlphaVantage,
    Yahoo,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" | "file" => Ok(SourceKind::Csv),
            "alphavantage" | "alpha_vantage" | "av" => Ok(SourceKind::AlphaVantage),
            "yahoo" => Ok(SourceKind::Yahoo),
            other => Err(format!(
                "unknown source '{}', expected csv, alphavantage or yahoo",
                other
            )),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Csv => "csv",
            SourceKind::AlphaVantage => "alphavantage",
            SourceKind::Yahoo => "yahoo",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: SourceKind,
    pub timeout_secs: u64,
    pub cache_dir: PathBuf,
    pub ttl_hours: i64,
    pub throttle_ms: u64,
    pub ranking: RankOptions,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendRankError> {
        let source = match config.get_non_empty("source", "kind") {
            Some(kind) => kind.parse().map_err(|reason| invalid("source", "kind", reason))?,
            None => SourceKind::Csv,
        };

        if source == SourceKind::AlphaVantage && config.get_non_empty("source", "api_key").is_none() {
            return Err(TrendRankError::ConfigMissing {
                section: "source".to_string(),
                key: "api_key".to_string(),
            });
        }

        let timeout_secs = config.get_int("source", "timeout_secs", DEFAULT_TIMEOUT_SECS);
        if timeout_secs <= 0 {
            return Err(invalid("source", "timeout_secs", "timeout_secs must be positive"));
        }

        let ttl_hours = config.get_int("cache", "ttl_hours", DEFAULT_TTL_HOURS);
        if ttl_hours < 0 {
            return Err(invalid("cache", "ttl_hours", "ttl_hours must be non-negative"));
        }

        let throttle_ms = config.get_int("cache", "throttle_ms", DEFAULT_THROTTLE_MS);
        if throttle_ms < 0 {
            return Err(invalid("cache", "throttle_ms", "throttle_ms must be non-negative"));
        }

        let cache_dir = config
            .get_non_empty("cache", "dir")
            .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());

        Ok(Self {
            source,
            timeout_secs: timeout_secs as u64,
            cache_dir: PathBuf::from(cache_dir),
            ttl_hours,
            throttle_ms: throttle_ms as u64,
            ranking: ranking_options(config)?,
        })
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours)
    }

    pub fn throttle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.throttle_ms)
    }
}

fn ranking_options(config: &dyn ConfigPort) -> Result<RankOptions, TrendRankError> {
    let window = |key: &str, default: usize| -> Result<usize, TrendRankError> {
        let value = config.get_int("ranking", key, default as i64);
        if value <= 0 {
            return Err(invalid("ranking", key, format!("{} must be positive", key)));
        }
        Ok(value as usize)
    };
    let fast = window("fast", DEFAULT_FAST)?;
    let slow = window("slow", DEFAULT_SLOW)?;

    let top = match config.get_int("ranking", "top", 0) {
        n if n < 0 => return Err(invalid("ranking", "top", "top must be non-negative")),
        0 => None,
        n => Some(n as usize),
    };

    Ok(RankOptions {
        fast,
        slow,
        top,
        decision_only: config.get_bool("ranking", "decision_only", false),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TrendRankError {
    TrendRankError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
