//! Pipeline configuration from `pulse.toml`.
//!
//! Every field is optional in the file. The CLI merges flags on top, so a
//! value given on the command line always wins.

use crate::artifact::{self, ArtifactError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TICKERS: &[&str] = &["SPY", "QQQ", "GLD", "TLT", "DXY"];
pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_PERIOD: &str = "30d";
pub const DEFAULT_LOOKBACK_DAYS: usize = 5;
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    /// Ticker used for relative performance; empty disables it.
    pub benchmark: String,
    pub period: String,
    pub lookback_days: usize,
    pub cache_dir: PathBuf,
    /// Timing template used when a stage is not given `--timing`.
    pub timing: Option<PathBuf>,
    pub ffmpeg: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
            period: DEFAULT_PERIOD.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            cache_dir: PathBuf::from("data/cache"),
            timing: None,
            ffmpeg: DEFAULT_FFMPEG.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = artifact::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn benchmark(&self) -> Option<&str> {
        let b = self.benchmark.trim();
        (!b.is_empty()).then_some(b)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be at least 1".into()));
        }
        if self.ffmpeg.trim().is_empty() {
            return Err(ConfigError::Invalid("ffmpeg must name an executable".into()));
        }
        Ok(())
    }
}
