//! Data provider trait and structured error types.
//!
//! `DataProvider` abstracts over price sources so the fetch stage can be
//! driven by Yahoo Finance in production and by canned rows in tests.

use crate::artifact::ArtifactError;
use crate::domain::PriceRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid lookback period '{0}' (expected e.g. 30d, 3mo, 1y)")]
    InvalidPeriod(String),

    #[error("no tickers to fetch")]
    NoTickers,

    #[error("no price cache found in {dir} — run `pulse fetch` first")]
    NoCachedData { dir: String },

    #[error("malformed cache row: {0}")]
    MalformedRow(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub rows: Vec<PriceRow>,
    pub source: DataSource,
}

/// Where the rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Fixture,
}

/// A source of daily price rows.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily rows for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// False while the provider is refusing requests (rate limit, ban).
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol fetches.
pub trait FetchProgress: Send {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter backed by `tracing`.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!("[{}/{}] fetching {symbol}", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(rows) => info!(rows, "ok: {symbol}"),
            Err(e) => warn!("failed: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
