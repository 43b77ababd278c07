//! Market signals and title candidates.
//!
//! Detection looks only at the last bars of each series. A ticker with fewer
//! than three bars produces no signals.

use crate::artifact::{self, ArtifactError};
use crate::domain::{PriceCache, PriceSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FAST_MA: usize = 20;
pub const SLOW_MA: usize = 50;
pub const VOLUME_MA: usize = 20;
pub const VOLUME_SPIKE_RATIO: f64 = 2.0;
pub const DIVERGENCE_BARS: usize = 5;
/// Percentage points.
pub const DIVERGENCE_THRESHOLD: f64 = 1.0;
const MIN_BARS: usize = 3;

/// Rolling mean that starts emitting from the first value, averaging over
/// however many values are available until the window fills.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push(sum / (i + 1).min(window) as f64);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    MaCrossover {
        #[serde(rename = "dir")]
        direction: Direction,
        narrative: String,
    },
    VolumeSpike {
        vol_ratio: f64,
        narrative: String,
    },
    Divergence {
        diff_pct: f64,
        narrative: String,
    },
}

impl Signal {
    pub fn narrative(&self) -> &str {
        match self {
            Signal::MaCrossover { narrative, .. }
            | Signal::VolumeSpike { narrative, .. }
            | Signal::Divergence { narrative, .. } => narrative,
        }
    }

    /// Lower sorts first when picking a headline.
    fn headline_rank(&self) -> u8 {
        match self {
            Signal::MaCrossover { .. } => 0,
            Signal::VolumeSpike { .. } => 1,
            Signal::Divergence { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSignals {
    pub ticker: String,
    pub signals: Vec<Signal>,
}

impl TickerSignals {
    /// Crossover beats volume spike beats divergence.
    pub fn headline(&self) -> String {
        self.signals
            .iter()
            .min_by_key(|s| s.headline_rank())
            .map(|s| s.narrative().to_string())
            .unwrap_or_else(|| format!("Market note — {}", self.ticker))
    }
}

fn crossover(ticker: &str, closes: &[f64]) -> Option<Signal> {
    let fast = rolling_mean(closes, FAST_MA);
    let slow = rolling_mean(closes, SLOW_MA);
    let n = closes.len();
    let (f1, s1, f0, s0) = (fast[n - 1], slow[n - 1], fast[n - 2], slow[n - 2]);

    if f1 > s1 && f0 <= s0 {
        Some(Signal::MaCrossover {
            direction: Direction::Bullish,
            narrative: format!("Signal Alert — {ticker} Momentum Flip!"),
        })
    } else if f1 < s1 && f0 >= s0 {
        Some(Signal::MaCrossover {
            direction: Direction::Bearish,
            narrative: format!("Signal Alert — {ticker} Momentum Flip (bearish)!"),
        })
    } else {
        None
    }
}

fn volume_spike(ticker: &str, volumes: &[f64]) -> Option<Signal> {
    let avg = *rolling_mean(volumes, VOLUME_MA).last()?;
    let ratio = volumes.last()? / avg.max(1.0);
    (ratio >= VOLUME_SPIKE_RATIO).then(|| Signal::VolumeSpike {
        vol_ratio: (ratio * 100.0).round() / 100.0,
        narrative: format!("Volume spike — {ticker} volume is {ratio:.1}x its 20-day average."),
    })
}

/// Return over the last `bars` bars; `None` when the series is too short.
fn trailing_return(closes: &[f64], bars: usize) -> Option<f64> {
    let n = closes.len();
    if n <= bars {
        return None;
    }
    let base = closes[n - 1 - bars];
    (base != 0.0).then(|| closes[n - 1] / base - 1.0)
}

fn divergence(ticker: &str, closes: &[f64], bench: &PriceSeries) -> Option<Signal> {
    let ret = trailing_return(closes, DIVERGENCE_BARS)?;
    let bench_ret = trailing_return(&bench.closes(), DIVERGENCE_BARS).unwrap_or(0.0);
    let diff = (ret - bench_ret) * 100.0;
    (diff.abs() >= DIVERGENCE_THRESHOLD).then(|| Signal::Divergence {
        diff_pct: (diff * 100.0).round() / 100.0,
        narrative: format!(
            "{ticker} has diverged from {} by {diff:.2}% this week.",
            bench.ticker
        ),
    })
}

/// Signals for one ticker, compared against `benchmark` when given.
pub fn detect(series: &PriceSeries, benchmark: Option<&PriceSeries>) -> TickerSignals {
    let ticker = series.ticker.as_str();
    let closes = series.closes();
    let mut signals = Vec::new();

    if closes.len() >= MIN_BARS {
        let volumes: Vec<f64> = series.volumes().into_iter().map(|v| v as f64).collect();
        signals.extend(crossover(ticker, &closes));
        signals.extend(volume_spike(ticker, &volumes));
        if let Some(bench) = benchmark.filter(|b| b.ticker != series.ticker) {
            signals.extend(divergence(ticker, &closes, bench));
        }
    }

    TickerSignals {
        ticker: ticker.to_string(),
        signals,
    }
}

/// `signals.json`: every ticker that fired at least one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub generated_at: DateTime<Utc>,
    pub signals: Vec<TickerSignals>,
}

impl SignalReport {
    pub fn detect(cache: &PriceCache, benchmark: Option<&str>, generated_at: DateTime<Utc>) -> Self {
        let by_ticker = cache.by_ticker();
        let bench = benchmark.and_then(|b| by_ticker.get(b));
        let signals = by_ticker
            .values()
            .map(|series| detect(series, bench))
            .filter(|t| !t.signals.is_empty())
            .collect();
        Self {
            generated_at,
            signals,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        artifact::read_json(path)
    }

    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        artifact::write_json(path, self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub line1: String,
    pub line2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleCandidate {
    pub ticker: String,
    pub title: String,
    pub thumb: Thumbnail,
}

/// `title.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleSheet {
    pub candidates: Vec<TitleCandidate>,
}

impl TitleSheet {
    pub fn from_report(report: &SignalReport) -> Self {
        let candidates = report
            .signals
            .iter()
            .map(|t| {
                let headline = t.headline();
                let line1 = headline
                    .split(" — ")
                    .next()
                    .unwrap_or(headline.as_str())
                    .to_string();
                TitleCandidate {
                    ticker: t.ticker.clone(),
                    title: format!("📊 {headline} — Here's What That Means (30s)"),
                    thumb: Thumbnail {
                        line1,
                        line2: format!("{} • {} signals", t.ticker, t.signals.len()),
                    },
                }
            })
            .collect();
        Self { candidates }
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        artifact::read_json(path)
    }

    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        artifact::write_json(path, self)
    }
}
