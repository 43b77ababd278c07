//! `chart_meta.json`: chart id to file path and dimensions.

use crate::artifact::{self, ArtifactError};
use crate::schema::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Price,
    PctChange,
    Volume,
    TopMovers,
    Interactive,
    TitleCard,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Price => "price",
            ChartKind::PctChange => "pct_change",
            ChartKind::Volume => "volume",
            ChartKind::TopMovers => "top_movers",
            ChartKind::Interactive => "interactive",
            ChartKind::TitleCard => "title_card",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartEntry {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default)]
    pub kind: ChartKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartMeta {
    pub charts: BTreeMap<String, ChartEntry>,
}

impl ChartMeta {
    /// Conventional chart id: `<TICKER>_<kind>`.
    pub fn chart_id(ticker: &str, kind: ChartKind) -> String {
        format!("{ticker}_{}", kind.as_str())
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: ChartEntry) {
        self.charts.insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ChartEntry> {
        self.charts.get(id)
    }

    /// The chart of `kind` for `ticker`, if rendered.
    pub fn for_ticker(&self, ticker: &str, kind: ChartKind) -> Option<&ChartEntry> {
        self.charts.get(&Self::chart_id(ticker, kind))
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let meta: Self = serde_json::from_str(json)?;
        for (id, entry) in &meta.charts {
            if entry.width == 0 || entry.height == 0 {
                return Err(SchemaError::InvalidDimensions {
                    id: id.clone(),
                    width: entry.width,
                    height: entry.height,
                });
            }
        }
        Ok(meta)
    }

    pub fn load(path: &Path) -> Result<Self, ChartMetaLoadError> {
        let content = artifact::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        artifact::write_json(path, self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChartMetaLoadError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid chart meta: {0}")]
    Schema(#[from] SchemaError),
}
