//! Price data: provider abstraction, Yahoo fetcher, circuit breaker, and the
//! dated CSV cache.

pub mod cache;
pub mod circuit_breaker;
pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use cache::{CacheMeta, CsvCacheStore};
pub use circuit_breaker::CircuitBreaker;
pub use fetch::{fetch_prices, normalize_tickers, FetchConfig, FetchSummary, LookbackPeriod};
pub use provider::{DataError, DataProvider, DataSource, FetchProgress, FetchResult, LogProgress};
pub use yahoo::YahooProvider;
