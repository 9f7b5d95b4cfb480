//! Domain error types.

/// Top-level error type for trendrank.
#[derive(Debug, thiserror::Error)]
pub enum TrendRankError {
    #[error("no data for {symbol} from {provider}")]
    NotFound { symbol: String, provider: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("deadline exceeded while loading {symbol}")]
    DeadlineExceeded { symbol: String },

    #[error("cache error: {reason}")]
    Cache { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendRankError {
    pub fn not_found(symbol: &str, provider: &str) -> Self {
        TrendRankError::NotFound {
            symbol: symbol.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn invalid_window(name: &str, window: usize) -> Self {
        TrendRankError::InvalidParameter {
            name: name.to_string(),
            reason: format!("window must be > 0, got {}", window),
        }
    }

    /// True for failures that only mean "this symbol has no usable data".
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            TrendRankError::NotFound { .. }
                | TrendRankError::Network { .. }
                | TrendRankError::Decode { .. }
                | TrendRankError::DeadlineExceeded { .. }
        )
    }
}

impl From<&TrendRankError> for std::process::ExitCode {
    fn from(err: &TrendRankError) -> Self {
        let code: u8 = match err {
            TrendRankError::Io(_) | TrendRankError::Cache { .. } => 1,
            TrendRankError::ConfigParse { .. }
            | TrendRankError::ConfigMissing { .. }
            | TrendRankError::ConfigInvalid { .. } => 2,
            TrendRankError::InvalidParameter { .. } => 4,
            TrendRankError::NotFound { .. }
            | TrendRankError::Network { .. }
            | TrendRankError::Decode { .. }
            | TrendRankError::DeadlineExceeded { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
