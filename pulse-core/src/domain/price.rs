//! Price rows, the unit of the daily CSV cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One daily OHLCV row for a single ticker.
///
/// Volume is optional: some instruments (indices, FX) report none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl PriceRow {
    /// True if the close is missing (NaN). Such rows are kept in the cache but
    /// skipped by fact computation.
    pub fn is_void(&self) -> bool {
        self.close.is_nan()
    }

    /// Basic OHLC sanity: high >= low, both bracket open and close, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() || self.open.is_nan() || self.high.is_nan() || self.low.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// All rows of one ticker, sorted by date ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub rows: Vec<PriceRow>,
}

impl PriceSeries {
    /// Closing prices, void rows excluded.
    pub fn closes(&self) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|r| !r.is_void())
            .map(|r| r.close)
            .collect()
    }

    /// Volumes aligned with `closes()`; missing volume reads as zero.
    pub fn volumes(&self) -> Vec<u64> {
        self.rows
            .iter()
            .filter(|r| !r.is_void())
            .map(|r| r.volume.unwrap_or(0))
            .collect()
    }

    /// The last `n` non-void rows.
    pub fn tail(&self, n: usize) -> Vec<&PriceRow> {
        let valid: Vec<&PriceRow> = self.rows.iter().filter(|r| !r.is_void()).collect();
        let start = valid.len().saturating_sub(n);
        valid[start..].to_vec()
    }

    pub fn last(&self) -> Option<&PriceRow> {
        self.rows.iter().rev().find(|r| !r.is_void())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The contents of one cache file: rows for every fetched ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceCache {
    rows: Vec<PriceRow>,
}

impl PriceCache {
    pub fn new(rows: Vec<PriceRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct tickers present, sorted.
    pub fn tickers(&self) -> BTreeSet<String> {
        self.rows.iter().map(|r| r.symbol.clone()).collect()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.rows.iter().any(|r| r.symbol == ticker)
    }

    /// The date-sorted series for a ticker, if present.
    pub fn series(&self, ticker: &str) -> Option<PriceSeries> {
        let mut rows: Vec<PriceRow> = self
            .rows
            .iter()
            .filter(|r| r.symbol == ticker)
            .cloned()
            .collect();
        if rows.is_empty() {
            return None;
        }
        rows.sort_by_key(|r| r.date);
        Some(PriceSeries {
            ticker: ticker.to_string(),
            rows,
        })
    }

    /// Every ticker's series, keyed and ordered by ticker.
    pub fn by_ticker(&self) -> BTreeMap<String, PriceSeries> {
        let mut grouped: BTreeMap<String, Vec<PriceRow>> = BTreeMap::new();
        for row in &self.rows {
            grouped.entry(row.symbol.clone()).or_default().push(row.clone());
        }
        grouped
            .into_iter()
            .map(|(ticker, mut rows)| {
                rows.sort_by_key(|r| r.date);
                (ticker.clone(), PriceSeries { ticker, rows })
            })
            .collect()
    }

    /// First and last date across all rows.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.iter().map(|r| r.date).min()?;
        let last = self.rows.iter().map(|r| r.date).max()?;
        Some((first, last))
    }
}
