//! Chart stage: price cache -> SVG/HTML charts + `chart_meta.json`.
//!
//! Tickers render in parallel; the metadata is assembled afterwards so its
//! contents do not depend on scheduling.

pub mod html;
pub mod render;
pub mod svg;

use pulse_core::artifact::{self, ArtifactError};
use pulse_core::domain::{PriceCache, PriceSeries};
use pulse_core::{ChartEntry, ChartKind, ChartMeta};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CHART_META_FILE: &str = "chart_meta.json";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("price cache has no rows")]
    EmptyCache,

    #[error("ticker '{0}' is not in the price cache")]
    UnknownTicker(String),

    #[error("failed to encode interactive chart: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub outdir: PathBuf,
    /// Restrict to these tickers; `None` renders every cached ticker.
    pub tickers: Option<Vec<String>>,
    /// Bars in the percent-change chart.
    pub pct_days: usize,
    /// Bars in the volume chart.
    pub volume_days: usize,
    /// Also write a Plotly candlestick page per ticker.
    pub interactive: bool,
    /// Rows in the top-movers table.
    pub top_n: usize,
}

impl ChartConfig {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
            tickers: None,
            pct_days: 5,
            volume_days: 30,
            interactive: false,
            top_n: 5,
        }
    }
}

#[derive(Debug)]
pub struct ChartRun {
    pub meta: ChartMeta,
    pub meta_path: PathBuf,
}

fn write_chart(
    outdir: &Path,
    file: String,
    body: &str,
    (width, height): (u32, u32),
    ticker: Option<&str>,
    kind: ChartKind,
) -> Result<ChartEntry, ArtifactError> {
    let path = outdir.join(file);
    artifact::write_atomic(&path, body.as_bytes())?;
    debug!(path = %path.display(), "chart written");
    Ok(ChartEntry {
        path,
        width,
        height,
        ticker: ticker.map(str::to_string),
        kind,
    })
}

fn render_ticker(series: &PriceSeries, config: &ChartConfig) -> Result<Vec<ChartEntry>, ChartError> {
    let t = series.ticker.as_str();
    let out = &config.outdir;
    let mut entries = Vec::with_capacity(4);

    let price = render::price_chart(series);
    entries.push(write_chart(
        out,
        format!("{t}_price.svg"),
        &price.finish(),
        render::TALL,
        Some(t),
        ChartKind::Price,
    )?);

    let pct = render::pct_change_chart(series, config.pct_days);
    entries.push(write_chart(
        out,
        format!("{t}_pct_change.svg"),
        &pct.finish(),
        render::WIDE,
        Some(t),
        ChartKind::PctChange,
    )?);

    let volume = render::volume_chart(series, config.volume_days);
    entries.push(write_chart(
        out,
        format!("{t}_volume.svg"),
        &volume.finish(),
        render::WIDE,
        Some(t),
        ChartKind::Volume,
    )?);

    if config.interactive {
        let (w, h) = render::TALL;
        let page = html::candlestick_page(series, w, h)?;
        entries.push(write_chart(
            out,
            format!("{t}_interactive.html"),
            &page,
            render::TALL,
            Some(t),
            ChartKind::Interactive,
        )?);
    }
    Ok(entries)
}

/// Render every chart and write `chart_meta.json` into the output directory.
pub fn render_charts(cache: &PriceCache, config: &ChartConfig) -> Result<ChartRun, ChartError> {
    if cache.is_empty() {
        return Err(ChartError::EmptyCache);
    }
    let by_ticker = cache.by_ticker();
    let series: Vec<&PriceSeries> = match &config.tickers {
        Some(wanted) => wanted
            .iter()
            .map(|t| {
                by_ticker
                    .get(t)
                    .ok_or_else(|| ChartError::UnknownTicker(t.clone()))
            })
            .collect::<Result<_, _>>()?,
        None => by_ticker.values().collect(),
    };

    let rendered: Vec<Vec<ChartEntry>> = series
        .par_iter()
        .map(|s| render_ticker(s, config))
        .collect::<Result<_, _>>()?;

    let mut meta = ChartMeta::default();
    for entry in rendered.into_iter().flatten() {
        if let Some(ticker) = entry.ticker.clone() {
            meta.insert(ChartMeta::chart_id(&ticker, entry.kind), entry);
        }
    }

    let movers = render::rank_movers(series.iter().copied(), config.top_n);
    let table = render::top_movers_table(&movers);
    let entry = write_chart(
        &config.outdir,
        "top_movers.svg".to_string(),
        &table.finish(),
        render::WIDE,
        None,
        ChartKind::TopMovers,
    )?;
    meta.insert(ChartKind::TopMovers.as_str(), entry);

    let meta_path = config.outdir.join(CHART_META_FILE);
    meta.write(&meta_path)?;
    info!(charts = meta.len(), path = %meta_path.display(), "charts rendered");
    Ok(ChartRun { meta, meta_path })
}
