//! Data access port trait.
//!
//! One implementation per price source. Implementations return
//! `TrendRankError::NotFound` when a symbol has no usable data, and never
//! cache or throttle on their own.

use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::TimeSeries;
use std::fmt;

pub trait DataPort {
    /// Stable identifier, used as the cache namespace.
    fn source_name(&self) -> &str;

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError>;

    /// Symbols this source can enumerate on its own. Sources without a
    /// listing return an empty list.
    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        Ok(Vec::new())
    }

    /// Diagnostic fetch for one symbol, used when nothing could be ranked.
    fn probe(&self, symbol: &str) -> ProbeReport {
        match self.fetch_series(symbol) {
            Ok(series) => ProbeReport::ok(format!("Received {} bars", series.len())),
            Err(e) => ProbeReport::error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    pub message: String,
    pub detail: Option<String>,
}

impl ProbeReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Ok,
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Error,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Error => "error",
        };
        write!(f, "{}: {}", status, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
