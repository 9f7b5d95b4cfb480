//! Closed set of price sources behind one [`DataPort`].

use crate::adapters::alpha_vantage_adapter::AlphaVantageAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::TimeSeries;
use crate::domain::settings::SourceKind;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, ProbeReport};

pub enum Source {
    File(CsvAdapter),
    AlphaVantage(AlphaVantageAdapter),
    Yahoo(YahooAdapter),
}

impl Source {
    pub fn from_config(kind: SourceKind, config: &dyn ConfigPort) -> Result<Self, TrendRankError> {
        let source = match kind {
            SourceKind::Csv => Source::File(CsvAdapter::from_config(config)),
            SourceKind::AlphaVantage => Source::AlphaVantage(AlphaVantageAdapter::from_config(config)?),
            SourceKind::Yahoo => Source::Yahoo(YahooAdapter::from_config(config)?),
        };
        log::debug!("using {} source", source.kind());
        Ok(source)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::File(_) => SourceKind::Csv,
            Source::AlphaVantage(_) => SourceKind::AlphaVantage,
            Source::Yahoo(_) => SourceKind::Yahoo,
        }
    }

    fn port(&self) -> &dyn DataPort {
        match self {
            Source::File(adapter) => adapter,
            Source::AlphaVantage(adapter) => adapter,
            Source::Yahoo(adapter) => adapter,
        }
    }

    /// Shown when symbols were requested but none could be ranked.
    pub fn troubleshooting_hint(&self) -> String {
        match self {
            Source::File(adapter) => format!(
                "No data loaded. Check that {} contains <SYMBOL>.csv files with \
                 Date,Open,High,Low,Close,Volume columns.",
                adapter.base_path().display()
            ),
            Source::AlphaVantage(_) => "No data loaded. The free Alpha Vantage tier allows \
                 about 5 requests per minute and 25 per day; check the API key, try fewer \
                 symbols or run `probe` to see the API message."
                .to_string(),
            Source::Yahoo(_) => "No data loaded. Yahoo may be rate-limiting or blocking this \
                 network; retry later, raise throttle_ms or run `probe` to see which hosts \
                 responded."
                .to_string(),
        }
    }
}

impl DataPort for Source {
    fn source_name(&self) -> &str {
        self.port().source_name()
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        self.port().fetch_series(symbol)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        self.port().list_symbols()
    }

    fn probe(&self, symbol: &str) -> ProbeReport {
        self.port().probe(symbol)
    }
}
