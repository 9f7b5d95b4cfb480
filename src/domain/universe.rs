//! Symbol universe: parsing user-supplied lists and discovering symbols
//! from the active source.

use crate::domain::error::TrendRankError;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;

/// Canonical symbol form: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Split a comma-separated list. Empty tokens are dropped and duplicates
/// keep their first position.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Explicit list when given, otherwise the source's own listing, capped at
/// `limit` when set.
pub fn resolve_symbols(
    explicit: Option<&str>,
    data_port: &dyn DataPort,
    limit: Option<usize>,
) -> Result<Vec<String>, TrendRankError> {
    let mut symbols = match explicit {
        Some(list) => parse_symbols(list),
        None => {
            let listed = data_port.list_symbols()?;
            log::info!(
                "{} listed {} symbols",
                data_port.source_name(),
                listed.len()
            );
            parse_symbols(&listed.join(","))
        }
    };
    if let Some(limit) = limit {
        symbols.truncate(limit);
    }
    Ok(symbols)
}
