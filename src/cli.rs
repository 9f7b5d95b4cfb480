//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use crate::adapters::alpha_vantage_adapter::API_KEY_ENV;
use crate::adapters::cached_loader::CachedLoader;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::source::Source;
use crate::domain::error::TrendRankError;
use crate::domain::ranking::{rank, RankedResult};
use crate::domain::settings::Settings;
use crate::domain::universe::resolve_symbols;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "trendrank", about = "Rank symbols by moving-average trend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand; each overrides the matching config key.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// csv, alphavantage or yahoo
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub apikey: Option<String>,
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    #[arg(long)]
    pub ttl_hours: Option<i64>,
    #[arg(long)]
    pub throttle_ms: Option<i64>,
    #[arg(long)]
    pub timeout_secs: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank symbols and print BUY / DON'T BUY recommendations
    Rank {
        #[command(flatten)]
        source: SourceArgs,
        /// Comma-separated symbols; defaults to the source's own listing
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        fast: Option<usize>,
        #[arg(long)]
        slow: Option<usize>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        decision_only: bool,
        /// Take at most N symbols from the source listing
        #[arg(long)]
        auto: Option<usize>,
        /// Stop fetching once this many seconds have passed
        #[arg(long)]
        deadline_secs: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// List symbols the source can enumerate
    ListSymbols {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fetch one symbol directly and report what the source returned
    Probe {
        #[arg(long)]
        symbol: String,
        #[command(flatten)]
        source: SourceArgs,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Rank {
            source,
            symbols,
            fast,
            slow,
            top,
            decision_only,
            auto,
            deadline_secs,
            json,
        } => {
            let overrides = RankOverrides {
                fast,
                slow,
                top,
                decision_only,
            };
            run_rank(
                &source,
                symbols.as_deref(),
                &overrides,
                auto,
                deadline_secs,
                json,
            )
        }
        Command::ListSymbols { source, limit } => run_list_symbols(&source, limit),
        Command::Probe { symbol, source } => run_probe(&source, &symbol),
    }
}

#[derive(Debug, Default)]
pub struct RankOverrides {
    pub fast: Option<usize>,
    pub slow: Option<usize>,
    pub top: Option<usize>,
    pub decision_only: bool,
}

/// Load the config file (if any) and layer the command-line flags on top.
pub fn load_config(args: &SourceArgs) -> Result<FileConfigAdapter, TrendRankError> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::empty(),
    };

    if let Some(kind) = &args.source {
        config.set("source", "kind", kind.as_str());
    }
    if let Some(dir) = &args.data_dir {
        config.set("source", "data_dir", dir.display().to_string());
    }
    if let Some(key) = &args.apikey {
        config.set("source", "api_key", key.as_str());
    } else if config.get_non_empty("source", "api_key").is_none() {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            config.set("source", "api_key", key);
        }
    }
    if let Some(timeout) = args.timeout_secs {
        config.set("source", "timeout_secs", timeout.to_string());
    }
    if let Some(dir) = &args.cache_dir {
        config.set("cache", "dir", dir.display().to_string());
    }
    if let Some(ttl) = args.ttl_hours {
        config.set("cache", "ttl_hours", ttl.to_string());
    }
    if let Some(ms) = args.throttle_ms {
        config.set("cache", "throttle_ms", ms.to_string());
    }
    Ok(config)
}

pub fn apply_rank_overrides(config: &mut FileConfigAdapter, overrides: &RankOverrides) {
    if let Some(fast) = overrides.fast {
        config.set("ranking", "fast", fast.to_string());
    }
    if let Some(slow) = overrides.slow {
        config.set("ranking", "slow", slow.to_string());
    }
    if let Some(top) = overrides.top {
        config.set("ranking", "top", top.to_string());
    }
    if overrides.decision_only {
        config.set("ranking", "decision_only", "true");
    }
}

fn build_loader(config: &dyn ConfigPort) -> Result<(Settings, CachedLoader<Source>), TrendRankError> {
    let settings = Settings::from_config(config)?;
    let source = Source::from_config(settings.source, config)?;
    let loader = CachedLoader::from_settings(source, &settings);
    Ok((settings, loader))
}

fn fail(err: &TrendRankError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_rank(
    args: &SourceArgs,
    symbols: Option<&str>,
    overrides: &RankOverrides,
    auto: Option<usize>,
    deadline_secs: Option<u64>,
    json: bool,
) -> ExitCode {
    let mut config = match load_config(args) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    apply_rank_overrides(&mut config, overrides);

    let (settings, mut loader) = match build_loader(&config) {
        Ok(built) => built,
        Err(e) => return fail(&e),
    };
    if let Some(secs) = deadline_secs {
        loader = loader.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let symbols = match resolve_symbols(symbols, &loader, auto) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if symbols.is_empty() {
        eprintln!("error: no symbols to rank (use --symbols)");
        eprintln!("{}", loader.inner().troubleshooting_hint());
        return ExitCode::from(2);
    }

    eprintln!(
        "Ranking {} symbols from {} (fast={}, slow={})",
        symbols.len(),
        settings.source,
        settings.ranking.fast,
        settings.ranking.slow
    );

    let results = match rank(&loader, &symbols, &settings.ranking) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    if results.is_empty() {
        eprintln!("No results.");
        if !settings.ranking.decision_only {
            eprintln!("{}", loader.inner().troubleshooting_hint());
        }
        return ExitCode::SUCCESS;
    }

    if json {
        match serde_json::to_string_pretty(&results) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                return fail(&TrendRankError::Decode {
                    reason: e.to_string(),
                });
            }
        }
    } else {
        print!("{}", format_table(&results));
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(args: &SourceArgs, limit: Option<usize>) -> ExitCode {
    let config = match load_config(args) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let (_, loader) = match build_loader(&config) {
        Ok(built) => built,
        Err(e) => return fail(&e),
    };

    let symbols = match resolve_symbols(None, &loader, limit) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found for source {}", loader.source_name());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_probe(args: &SourceArgs, symbol: &str) -> ExitCode {
    let config = match load_config(args) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let (_, loader) = match build_loader(&config) {
        Ok(built) => built,
        Err(e) => return fail(&e),
    };

    let report = loader.probe(symbol);
    println!("{} [{}] {}", symbol.trim().to_uppercase(), loader.source_name(), report);
    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(5)
    }
}

pub const TABLE_HEADER: &str = "SYMBOL\tSCORE\tDECISION\tLAST_CLOSE\tDIST_SLOW%\tFAST_SLOPE\tLAST_SIGNAL";

/// Tab-separated table with a header row; undefined values print as `-`.
pub fn format_table(results: &[RankedResult]) -> String {
    let opt = |value: Option<f64>, places: usize| match value {
        Some(v) => format!("{:.*}", places, v),
        None => "-".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", TABLE_HEADER);
    for r in results {
        let _ = writeln!(
            out,
            "{}\t{:.2}\t{}\t{}\t{}\t{}\t{}",
            r.symbol,
            r.score,
            r.decision,
            opt(r.last_close, 2),
            opt(r.dist_slow_pct, 2),
            opt(r.fast_slope, 4),
            r.last_signal.map_or_else(|| "-".to_string(), |p| p.to_string()),
        );
    }
    out
}
