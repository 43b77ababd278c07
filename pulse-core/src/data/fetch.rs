//! Fetch orchestrator: tickers -> provider -> one dated cache file.
//!
//! The run is all-or-nothing. If any ticker fails, no cache file is written,
//! so downstream stages never see a partial universe.

use super::cache::CsvCacheStore;
use super::provider::{DataError, DataProvider, FetchProgress};
use crate::artifact;
use crate::domain::{PriceCache, PriceRow};
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

/// History window requested from the provider, e.g. `30d`, `2wk`, `3mo`, `1y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackPeriod {
    days: u64,
}

impl LookbackPeriod {
    pub fn days(days: u64) -> Self {
        Self { days }
    }

    pub fn as_days(&self) -> u64 {
        self.days
    }

    /// First calendar day of the window ending on `end`.
    pub fn start_from(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_days(Days::new(self.days)).unwrap_or(NaiveDate::MIN)
    }
}

impl Default for LookbackPeriod {
    fn default() -> Self {
        Self::days(30)
    }
}

impl FromStr for LookbackPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let n: u64 = num
            .parse()
            .map_err(|_| DataError::InvalidPeriod(s.clone()))?;
        let per_unit = match unit {
            "d" => 1,
            "wk" | "w" => 7,
            "mo" => 30,
            "y" => 365,
            _ => return Err(DataError::InvalidPeriod(s)),
        };
        if n == 0 {
            return Err(DataError::InvalidPeriod(s));
        }
        Ok(Self::days(n * per_unit))
    }
}

/// Uppercase, trim, drop empties, dedupe, sort.
pub fn normalize_tickers<I, S>(tickers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tickers
        .into_iter()
        .map(|t| t.as_ref().trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub tickers: Vec<String>,
    pub period: LookbackPeriod,
    /// Last day requested; also names the cache file.
    pub end: NaiveDate,
    /// Where the raw per-run snapshot goes; `None` skips it.
    pub raw_dir: Option<PathBuf>,
    /// Replace an existing cache file for the same day.
    pub force: bool,
}

impl FetchConfig {
    pub fn new(tickers: Vec<String>) -> Self {
        Self {
            tickers,
            period: LookbackPeriod::default(),
            end: Local::now().date_naive(),
            raw_dir: None,
            force: false,
        }
    }
}

/// Latest quote per ticker, kept for provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RawQuote {
    pub symbol: String,
    pub close: f64,
    pub pct_change: f64,
    pub volume: Option<u64>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
struct RawSnapshot<'a> {
    request_ts: DateTime<Utc>,
    records: &'a [RawQuote],
}

#[derive(Debug)]
pub struct FetchSummary {
    pub cache_path: PathBuf,
    pub raw_path: Option<PathBuf>,
    pub rows: usize,
    pub quotes: Vec<RawQuote>,
}

/// Fetch every ticker and write the day's cache file.
pub fn fetch_prices(
    provider: &dyn DataProvider,
    store: &CsvCacheStore,
    config: &FetchConfig,
    progress: &dyn FetchProgress,
) -> Result<FetchSummary, DataError> {
    let tickers = normalize_tickers(&config.tickers);
    if tickers.is_empty() {
        return Err(DataError::NoTickers);
    }

    let request_ts = Utc::now();
    let start = config.period.start_from(config.end);
    let total = tickers.len();
    let mut rows: Vec<PriceRow> = Vec::new();
    let mut quotes = Vec::with_capacity(total);
    let mut first_error = None;
    let mut succeeded = 0;

    for (i, symbol) in tickers.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let result = provider.fetch(symbol, start, config.end);
        let report = result.as_ref().map(|r| r.rows.len()).map_err(clone_for_report);
        progress.on_complete(symbol, i, total, &report);

        match result {
            Ok(fetched) => {
                succeeded += 1;
                if let Some(quote) = latest_quote(&fetched.rows, provider.name()) {
                    quotes.push(quote);
                }
                rows.extend(fetched.rows);
            }
            Err(e) => {
                first_error.get_or_insert(e);
                if !provider.is_available() {
                    break;
                }
            }
        }
    }

    progress.on_batch_complete(succeeded, total - succeeded, total);
    if let Some(e) = first_error {
        return Err(e);
    }

    let raw_path = match &config.raw_dir {
        Some(dir) => {
            let path = dir.join(format!(
                "{}_tickers.json",
                request_ts.with_timezone(&Local).format("%Y%m%d_%H%M%S")
            ));
            artifact::write_json(
                &path,
                &RawSnapshot {
                    request_ts,
                    records: &quotes,
                },
            )?;
            Some(path)
        }
        None => None,
    };

    let row_count = rows.len();
    let cache = PriceCache::new(rows);
    let cache_path = store.write(config.end, &cache, provider.name(), config.force)?;

    Ok(FetchSummary {
        cache_path,
        raw_path,
        rows: row_count,
        quotes,
    })
}

fn latest_quote(rows: &[PriceRow], source: &str) -> Option<RawQuote> {
    let valid: Vec<&PriceRow> = rows.iter().filter(|r| !r.is_void()).collect();
    let last = *valid.last()?;
    let prev = valid.len().checked_sub(2).map(|i| valid[i]).unwrap_or(last);
    let pct_change = if prev.close != 0.0 {
        (last.close - prev.close) / prev.close * 100.0
    } else {
        0.0
    };
    Some(RawQuote {
        symbol: last.symbol.clone(),
        close: last.close,
        pct_change: (pct_change * 10_000.0).round() / 10_000.0,
        volume: last.volume,
        source: source.to_string(),
    })
}

/// `DataError` is not `Clone`; progress only needs the message.
fn clone_for_report(e: &DataError) -> DataError {
    DataError::Other(e.to_string())
}
