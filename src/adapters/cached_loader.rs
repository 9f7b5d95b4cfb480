//! Caching, throttled wrapper around any [`DataPort`].
//!
//! Fresh cache records are served without touching the wrapped adapter.
//! Misses go through a shared [`Throttle`] so consecutive adapter calls are
//! spaced by at least the configured interval, and successful fetches are
//! written back as JSON records.

use crate::domain::cache_record::CacheRecord;
use crate::domain::error::TrendRankError;
use crate::domain::ohlcv::TimeSeries;
use crate::domain::settings::Settings;
use crate::domain::universe::normalize_symbol;
use crate::ports::data_port::{DataPort, ProbeReport};
use chrono::Utc;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(400);

/// Minimum spacing between adapter calls.
///
/// The lock is held while sleeping, so callers sharing one throttle through
/// an `Arc` are serialized.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Block until the interval has passed since the previous call, then
    /// record this one.
    pub fn acquire(&self) {
        // no deadline, cannot fail
        let _ = self.acquire_before(None);
    }

    /// Like [`acquire`](Self::acquire), but gives up without sleeping when
    /// the wait would end after `deadline`. Returns whether the slot was taken.
    pub fn acquire_before(&self, deadline: Option<Instant>) -> bool {
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let ready_at = last_call.map_or(now, |last| (last + self.interval).max(now));
        if deadline.is_some_and(|d| ready_at > d) {
            return false;
        }
        if ready_at > now {
            thread::sleep(ready_at - now);
        }

        *last_call = Some(Instant::now());
        true
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}

/// One JSON file per `(source, symbol)` under `base_dir/<source>/`.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    base_dir: PathBuf,
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl JsonCacheStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn record_path(&self, source: &str, symbol: &str) -> PathBuf {
        self.base_dir
            .join(file_component(source))
            .join(format!("{}.json", file_component(symbol)))
    }

    /// The stored record, or `None` when absent, unreadable or belonging to
    /// another key.
    pub fn load(&self, source: &str, symbol: &str) -> Option<CacheRecord> {
        let path = self.record_path(source, symbol);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("cannot read cache record {}: {}", path.display(), e);
                return None;
            }
        };

        match CacheRecord::decode(&bytes) {
            Ok(record) if record.matches(source, symbol) => Some(record),
            Ok(_) => {
                log::warn!("cache record {} has a different key", path.display());
                None
            }
            Err(e) => {
                log::warn!("corrupt cache record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write via a temp file and rename so readers never see a partial record.
    pub fn store(&self, record: &CacheRecord) -> Result<PathBuf, TrendRankError> {
        let path = self.record_path(&record.source, &record.symbol);
        let cache_err = |e: io::Error| TrendRankError::Cache {
            reason: format!("{}: {}", path.display(), e),
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(cache_err)?;
        }

        let bytes = record.encode()?;
        let tmp_path = path.with_extension(format!(
            "json.{}-{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp_path, bytes).map_err(cache_err)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(cache_err(e));
        }
        Ok(path)
    }
}

/// Path separators would escape the source directory.
fn file_component(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

pub struct CachedLoader<P: DataPort> {
    inner: P,
    store: JsonCacheStore,
    throttle: Arc<Throttle>,
    ttl: chrono::Duration,
    deadline: Option<Instant>,
}

impl<P: DataPort> CachedLoader<P> {
    pub fn new(
        inner: P,
        store: JsonCacheStore,
        throttle: Arc<Throttle>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            inner,
            store,
            throttle,
            ttl,
            deadline: None,
        }
    }

    pub fn from_settings(inner: P, settings: &Settings) -> Self {
        Self::new(
            inner,
            JsonCacheStore::new(&settings.cache_dir),
            Arc::new(Throttle::new(settings.throttle())),
            settings.ttl(),
        )
    }

    /// Loads that would start an adapter call after `deadline` fail with
    /// `DeadlineExceeded` instead.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn store(&self) -> &JsonCacheStore {
        &self.store
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl<P: DataPort> DataPort for CachedLoader<P> {
    fn source_name(&self) -> &str {
        self.inner.source_name()
    }

    fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
        let symbol = normalize_symbol(symbol);
        let source = self.inner.source_name();

        if self.deadline_passed() {
            return Err(TrendRankError::DeadlineExceeded { symbol });
        }

        if let Some(record) = self.store.load(source, &symbol) {
            if record.is_fresh(Utc::now(), self.ttl) {
                log::debug!("{}: cache hit ({} bars)", symbol, record.bars.len());
                return Ok(record.into_series());
            }
            log::debug!("{}: cache record stale", symbol);
        }

        if !self.throttle.acquire_before(self.deadline) {
            return Err(TrendRankError::DeadlineExceeded { symbol });
        }

        log::info!("{}: fetching from {}", symbol, source);
        // keyed by the normalized symbol, whatever casing the adapter returned
        let fetched = self.inner.fetch_series(&symbol)?;
        let series = TimeSeries::new(symbol.clone(), fetched.into_bars());

        let record = CacheRecord::from_series(source, &series, Utc::now());
        if let Err(e) = self.store.store(&record) {
            log::warn!("{}: cache write failed: {}", symbol, e);
        }
        Ok(series)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendRankError> {
        self.throttle.acquire();
        self.inner.list_symbols()
    }

    /// Goes straight to the adapter; diagnostics must not be served from cache.
    fn probe(&self, symbol: &str) -> ProbeReport {
        self.throttle.acquire();
        self.inner.probe(&normalize_symbol(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    struct CountingPort {
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl CountingPort {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DataPort for CountingPort {
        fn source_name(&self) -> &str {
            "stub"
        }

        fn fetch_series(&self, symbol: &str) -> Result<TimeSeries, TrendRankError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(symbol.to_string());
            if symbol == "MISSING" {
                return Err(TrendRankError::not_found(symbol, "stub"));
            }
            let mut bars: Vec<OhlcvBar> = (1..=3)
                .map(|d| OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.0 + d as f64 * 0.125,
                    volume: 100,
                })
                .collect();
            match symbol {
                "GAPPY" => {
                    bars.push(OhlcvBar {
                        date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                        open: 10.0,
                        high: f64::NAN,
                        low: 9.0,
                        close: 10.5,
                        volume: 100,
                    });
                    Ok(TimeSeries::new(symbol, bars))
                }
                "LOWER" => Ok(TimeSeries::new("lower", bars)),
                _ => Ok(TimeSeries::new(symbol, bars)),
            }
        }
    }

    fn loader(dir: &TempDir, ttl: chrono::Duration) -> CachedLoader<CountingPort> {
        CachedLoader::new(
            CountingPort::new(),
            JsonCacheStore::new(dir.path()),
            Arc::new(Throttle::new(Duration::ZERO)),
            ttl,
        )
    }

    #[test]
    fn second_load_within_ttl_hits_cache() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(24));

        let first = loader.fetch_series("MSFT").unwrap();
        let second = loader.fetch_series("MSFT").unwrap();

        assert_eq!(loader.inner().calls(), 1);
        assert_eq!(first, second);
        assert!(dir.path().join("stub").join("MSFT.json").is_file());
    }

    #[test]
    fn stale_record_is_refetched() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::zero());

        loader.fetch_series("MSFT").unwrap();
        thread::sleep(Duration::from_millis(5));
        loader.fetch_series("MSFT").unwrap();

        assert_eq!(loader.inner().calls(), 2);
    }

    #[test]
    fn symbol_is_normalized_before_lookup() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(1));

        loader.fetch_series(" msft ").unwrap();
        loader.fetch_series("MSFT").unwrap();

        assert_eq!(loader.inner().calls(), 1);
        assert_eq!(*loader.inner().requested.lock().unwrap(), vec!["MSFT"]);
    }

    #[test]
    fn non_finite_bars_never_reach_the_cache() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(24));

        let first = loader.fetch_series("GAPPY").unwrap();
        let second = loader.fetch_series("GAPPY").unwrap();

        assert_eq!(first.len(), 3);
        assert!(first.bars().iter().all(OhlcvBar::is_finite));
        assert_eq!(first, second);
        assert_eq!(loader.inner().calls(), 1);
    }

    #[test]
    fn adapter_symbol_casing_does_not_defeat_cache() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(24));

        let first = loader.fetch_series("lower").unwrap();
        let second = loader.fetch_series("LOWER").unwrap();

        assert_eq!(first.symbol(), "LOWER");
        assert_eq!(first, second);
        assert_eq!(loader.inner().calls(), 1);
        assert!(loader.store().load("stub", "LOWER").is_some());
    }

    #[test]
    fn not_found_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(1));

        assert!(matches!(
            loader.fetch_series("missing"),
            Err(TrendRankError::NotFound { .. })
        ));
        assert!(!loader.store().record_path("stub", "MISSING").exists());
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(1));
        let path = loader.store().record_path("stub", "MSFT");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();

        let series = loader.fetch_series("MSFT").unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(loader.inner().calls(), 1);
        assert!(loader.store().load("stub", "MSFT").is_some());
    }

    #[test]
    fn record_for_another_symbol_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path());
        let series = CountingPort::new().fetch_series("AAPL").unwrap();
        let record = CacheRecord::from_series("stub", &series, Utc::now());
        let path = store.record_path("stub", "MSFT");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, record.encode().unwrap()).unwrap();

        assert!(store.load("stub", "MSFT").is_none());
    }

    #[test]
    fn path_separators_are_replaced() {
        let store = JsonCacheStore::new("/cache");
        assert_eq!(
            store.record_path("yahoo", "BRK/B"),
            PathBuf::from("/cache/yahoo/BRK_B.json")
        );
        assert_eq!(
            store.record_path("csv", "..\\X"),
            PathBuf::from("/cache/csv/.._X.json")
        );
    }

    #[test]
    fn store_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path());
        let series = CountingPort::new().fetch_series("AAPL").unwrap();
        let record = CacheRecord::from_series("stub", &series, Utc::now());

        store.store(&record).unwrap();
        store.store(&record).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path().join("stub"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["AAPL.json"]);
    }

    #[test]
    fn passed_deadline_skips_adapter() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, chrono::Duration::hours(1)).with_deadline(Instant::now());

        assert!(matches!(
            loader.fetch_series("MSFT"),
            Err(TrendRankError::DeadlineExceeded { .. })
        ));
        assert_eq!(loader.inner().calls(), 0);
        assert!(!loader.store().record_path("stub", "MSFT").exists());
    }

    #[test]
    fn throttle_spaces_calls() {
        let throttle = Throttle::new(Duration::from_millis(50));
        let start = Instant::now();
        throttle.acquire();
        throttle.acquire();
        throttle.acquire();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn throttle_refuses_wait_past_deadline() {
        let throttle = Throttle::new(Duration::from_secs(10));
        assert!(throttle.acquire_before(None));

        let start = Instant::now();
        assert!(!throttle.acquire_before(Some(start + Duration::from_millis(10))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shared_throttle_serializes_threads() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(40)));
        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                thread::spawn(move || throttle.acquire())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
