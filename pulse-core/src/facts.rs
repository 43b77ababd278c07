//! Derived facts: the small set of numbers the narration is built from.
//!
//! Every fact has a stable id `<TICKER>.<fact_name>` so story segments can
//! reference exactly which numbers they quote.

use crate::domain::{PriceCache, PriceSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bars used for the momentum fact.
pub const MOMENTUM_BARS: usize = 30;
/// Bars (before the last one) averaged for the volume multiple.
pub const VOLUME_AVG_BARS: usize = 20;
/// Volume multiple above which a move is called out as unusual.
pub const UNUSUAL_VOLUME_MULT: f64 = 1.5;

pub const FACT_CLOSE: &str = "close";
pub const FACT_PCT_CHANGE: &str = "pct_change";
pub const FACT_SLOPE: &str = "slope";
pub const FACT_MOMENTUM: &str = "momentum_30d";
pub const FACT_VOLUME: &str = "volume";
pub const FACT_VOL_MULT: &str = "vol_mult";
pub const FACT_REL_BENCHMARK: &str = "rel_benchmark";

/// Build a fact id.
pub fn fact_id(ticker: &str, fact: &str) -> String {
    format!("{ticker}.{fact}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickerFacts {
    pub ticker: String,
    /// Last close.
    pub close: f64,
    /// Percent change from the first to the last close of the lookback window.
    pub pct_change: f64,
    /// Least-squares slope of closes over the lookback window (price per bar).
    pub slope: f64,
    /// Percent change over the last 30 bars; zero with less history.
    pub momentum_30d: f64,
    /// Last bar's volume.
    pub volume: u64,
    /// Last volume over the average of the preceding 20 bars.
    pub vol_mult: f64,
    /// `pct_change` minus the benchmark's, when a benchmark is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_benchmark: Option<f64>,
}

impl TickerFacts {
    /// Facts for one series. `None` if the series has no valid close.
    pub fn compute(series: &PriceSeries, lookback_days: usize) -> Option<Self> {
        let closes = series.closes();
        let volumes = series.volumes();
        let close = *closes.last()?;

        let window_start = closes.len().saturating_sub(lookback_days.max(1));
        let window = &closes[window_start..];
        let (pct_change, slope) = if window.len() >= 2 {
            (pct_between(window[0], close), linear_slope(window))
        } else {
            (0.0, 0.0)
        };

        let momentum_30d = if closes.len() >= MOMENTUM_BARS {
            pct_between(closes[closes.len() - MOMENTUM_BARS], close)
        } else {
            0.0
        };

        let volume = volumes.last().copied().unwrap_or(0);
        let vol_mult = volume_multiple(&volumes);

        Some(Self {
            ticker: series.ticker.clone(),
            close,
            pct_change: round_to(pct_change, 4),
            slope: round_to(slope, 6),
            momentum_30d: round_to(momentum_30d, 4),
            volume,
            vol_mult: round_to(vol_mult, 2),
            rel_benchmark: None,
        })
    }

    pub fn has_unusual_volume(&self) -> bool {
        self.vol_mult > UNUSUAL_VOLUME_MULT
    }

    /// Ids of every fact this record carries.
    pub fn fact_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = [
            FACT_CLOSE,
            FACT_PCT_CHANGE,
            FACT_SLOPE,
            FACT_MOMENTUM,
            FACT_VOLUME,
            FACT_VOL_MULT,
        ]
        .iter()
        .map(|f| fact_id(&self.ticker, f))
        .collect();
        if self.rel_benchmark.is_some() {
            ids.push(fact_id(&self.ticker, FACT_REL_BENCHMARK));
        }
        ids
    }
}

/// Facts for every ticker in a cache, plus the parameters they were computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactSet {
    pub lookback_days: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    pub tickers: Vec<TickerFacts>,
}

impl FactSet {
    /// Compute facts for `symbols` (all cached tickers when `None`), in ticker order.
    ///
    /// Tickers without data are skipped. Relative performance is filled in when
    /// `benchmark` is among the computed tickers.
    pub fn compute(
        cache: &PriceCache,
        symbols: Option<&[String]>,
        lookback_days: usize,
        benchmark: Option<&str>,
    ) -> Self {
        let wanted: Option<BTreeSet<&str>> =
            symbols.map(|s| s.iter().map(String::as_str).collect());

        let mut tickers: Vec<TickerFacts> = cache
            .by_ticker()
            .values()
            .filter(|s| wanted.as_ref().map_or(true, |w| w.contains(s.ticker.as_str())))
            .filter_map(|s| TickerFacts::compute(s, lookback_days))
            .collect();

        let bench_pct = benchmark
            .and_then(|b| tickers.iter().find(|t| t.ticker == b))
            .map(|t| t.pct_change);
        let benchmark = benchmark
            .filter(|_| bench_pct.is_some())
            .map(str::to_string);

        if let (Some(bench), Some(bench_pct)) = (&benchmark, bench_pct) {
            for t in tickers.iter_mut().filter(|t| &t.ticker != bench) {
                t.rel_benchmark = Some(round_to(t.pct_change - bench_pct, 4));
            }
        }

        Self {
            lookback_days,
            benchmark,
            tickers,
        }
    }

    pub fn get(&self, ticker: &str) -> Option<&TickerFacts> {
        self.tickers.iter().find(|t| t.ticker == ticker)
    }

    /// Tickers ranked by absolute percent change, largest first; ties by ticker.
    pub fn ranked(&self) -> Vec<&TickerFacts> {
        let mut ranked: Vec<&TickerFacts> = self.tickers.iter().collect();
        ranked.sort_by(|a, b| {
            b.pct_change
                .abs()
                .total_cmp(&a.pct_change.abs())
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        ranked
    }

    /// Every fact id in the set.
    pub fn fact_ids(&self) -> BTreeSet<String> {
        self.tickers.iter().flat_map(|t| t.fact_ids()).collect()
    }
}

fn pct_between(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

/// Least-squares slope of `ys` against 0, 1, 2, ...
fn linear_slope(ys: &[f64]) -> f64 {
    let n = ys.len() as f64;
    if ys.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn volume_multiple(volumes: &[u64]) -> f64 {
    let Some(&last) = volumes.last() else {
        return 1.0;
    };
    let prior: &[u64] = if volumes.len() > 2 {
        let end = volumes.len() - 1;
        &volumes[end.saturating_sub(VOLUME_AVG_BARS)..end]
    } else {
        volumes
    };
    let avg = prior.iter().map(|&v| v as f64).sum::<f64>() / prior.len() as f64;
    if avg > 0.0 {
        last as f64 / avg
    } else {
        1.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceRow;
    use chrono::NaiveDate;

    fn series(ticker: &str, closes: &[f64], volumes: &[u64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries {
            ticker: ticker.into(),
            rows: closes
                .iter()
                .zip(volumes)
                .enumerate()
                .map(|(i, (&c, &v))| PriceRow {
                    symbol: ticker.into(),
                    date: start + chrono::Days::new(i as u64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: Some(v),
                })
                .collect(),
        }
    }

    #[test]
    fn pct_change_uses_lookback_window() {
        let s = series("SPY", &[50.0, 100.0, 101.0, 102.0, 103.0, 110.0], &[1; 6]);
        let f = TickerFacts::compute(&s, 5).unwrap();
        assert_eq!(f.close, 110.0);
        assert_eq!(f.pct_change, 10.0);
    }

    #[test]
    fn slope_of_a_straight_line() {
        assert!((linear_slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[4.0]), 0.0);
    }

    #[test]
    fn momentum_needs_thirty_bars() {
        let short = series("A", &[1.0; 10], &[1; 10]);
        assert_eq!(TickerFacts::compute(&short, 5).unwrap().momentum_30d, 0.0);

        let mut closes = vec![100.0; 30];
        closes[29] = 120.0;
        let long = series("A", &closes, &[1; 30]);
        assert_eq!(TickerFacts::compute(&long, 5).unwrap().momentum_30d, 20.0);
    }

    #[test]
    fn volume_multiple_excludes_last_bar_from_average() {
        let s = series("A", &[1.0, 1.0, 1.0, 1.0], &[100, 100, 100, 300]);
        let f = TickerFacts::compute(&s, 5).unwrap();
        assert_eq!(f.vol_mult, 3.0);
        assert!(f.has_unusual_volume());
    }

    #[test]
    fn zero_volume_history_gives_neutral_multiple() {
        let s = series("A", &[1.0, 1.0, 1.0], &[0, 0, 0]);
        assert_eq!(TickerFacts::compute(&s, 5).unwrap().vol_mult, 1.0);
    }

    #[test]
    fn relative_performance_against_benchmark() {
        let mut rows = series("SPY", &[100.0, 101.0], &[1, 1]).rows;
        rows.extend(series("GLD", &[100.0, 103.0], &[1, 1]).rows);
        let facts = FactSet::compute(&PriceCache::new(rows), None, 5, Some("SPY"));
        assert_eq!(facts.benchmark.as_deref(), Some("SPY"));
        assert_eq!(facts.get("GLD").unwrap().rel_benchmark, Some(2.0));
        assert_eq!(facts.get("SPY").unwrap().rel_benchmark, None);
        assert!(facts.fact_ids().contains("GLD.rel_benchmark"));
        assert!(!facts.fact_ids().contains("SPY.rel_benchmark"));
    }

    #[test]
    fn absent_benchmark_is_dropped() {
        let rows = series("GLD", &[100.0, 103.0], &[1, 1]).rows;
        let facts = FactSet::compute(&PriceCache::new(rows), None, 5, Some("SPY"));
        assert!(facts.benchmark.is_none());
        assert!(facts.get("GLD").unwrap().rel_benchmark.is_none());
    }

    #[test]
    fn ranking_by_absolute_move_then_ticker() {
        let mut rows = series("AAA", &[100.0, 101.0], &[1, 1]).rows;
        rows.extend(series("BBB", &[100.0, 95.0], &[1, 1]).rows);
        rows.extend(series("CCC", &[100.0, 99.0], &[1, 1]).rows);
        let facts = FactSet::compute(&PriceCache::new(rows), None, 5, None);
        let order: Vec<&str> = facts.ranked().iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(order, vec!["BBB", "AAA", "CCC"]);
    }

    #[test]
    fn symbol_filter_limits_the_set() {
        let mut rows = series("AAA", &[1.0, 2.0], &[1, 1]).rows;
        rows.extend(series("BBB", &[1.0, 2.0], &[1, 1]).rows);
        let only = vec!["BBB".to_string()];
        let facts = FactSet::compute(&PriceCache::new(rows), Some(&only), 5, None);
        assert_eq!(facts.tickers.len(), 1);
        assert_eq!(facts.tickers[0].ticker, "BBB");
    }
}
