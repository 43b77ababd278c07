//! Dated CSV price cache.
//!
//! Layout: `{cache_dir}/{YYYYMMDD}_tickers.csv` with a metadata sidecar
//! `{YYYYMMDD}_tickers.csv.meta.json`.
//!
//! - Write-once: an existing file for the same day is never replaced unless forced
//! - Atomic writes (temp file + rename)
//! - Sidecar records tickers, row count, date range, and a BLAKE3 hash of the CSV
//! - Loading verifies the hash when a sidecar is present

use super::provider::DataError;
use crate::artifact::{self, ArtifactError};
use crate::domain::{PriceCache, PriceRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CACHE_SUFFIX: &str = "_tickers.csv";
const META_SUFFIX: &str = ".meta.json";

/// On-disk CSV record. Column order is the cache format.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    timestamp: String,
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<u64>,
}

impl From<&PriceRow> for CsvRecord {
    fn from(row: &PriceRow) -> Self {
        Self {
            timestamp: row.date.format("%Y-%m-%d").to_string(),
            symbol: row.symbol.clone(),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

impl TryFrom<CsvRecord> for PriceRow {
    type Error = DataError;

    fn try_from(rec: CsvRecord) -> Result<Self, Self::Error> {
        Ok(PriceRow {
            date: parse_timestamp(&rec.timestamp)?,
            symbol: rec.symbol,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume,
        })
    }
}

/// Accepts a plain date or a full RFC 3339 timestamp; only the date is kept.
fn parse_timestamp(raw: &str) -> Result<NaiveDate, DataError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"))
        .map_err(|_| DataError::MalformedRow(format!("unparseable timestamp '{raw}'")))
}

/// Metadata sidecar for one cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub file: String,
    pub tickers: Vec<String>,
    pub row_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_hash: String,
    pub source: String,
    pub cached_at: DateTime<Utc>,
}

/// Directory of dated cache files.
pub struct CsvCacheStore {
    cache_dir: PathBuf,
}

impl CsvCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/{YYYYMMDD}_tickers.csv`
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.cache_dir
            .join(format!("{}{CACHE_SUFFIX}", day.format("%Y%m%d")))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(META_SUFFIX);
        path.with_file_name(name)
    }

    /// Write the cache file for `day`. Refuses to replace an existing file
    /// unless `force`.
    pub fn write(
        &self,
        day: NaiveDate,
        cache: &PriceCache,
        source: &str,
        force: bool,
    ) -> Result<PathBuf, DataError> {
        let (start_date, end_date) = cache
            .date_range()
            .ok_or_else(|| DataError::Other("no rows to cache".into()))?;

        let bytes = encode_csv(cache.rows())?;
        let path = self.path_for(day);
        artifact::write_once(&path, &bytes, force)?;

        let meta = CacheMeta {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tickers: cache.tickers().into_iter().collect(),
            row_count: cache.rows().len(),
            start_date,
            end_date,
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            source: source.to_string(),
            cached_at: Utc::now(),
        };
        artifact::write_json(&Self::meta_path(&path), &meta)?;

        info!(path = %path.display(), rows = meta.row_count, "price cache written");
        Ok(path)
    }

    /// Load a cache file. When a sidecar exists its hash must match.
    pub fn load(path: &Path) -> Result<PriceCache, DataError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing {
                    path: path.to_path_buf(),
                }
                .into())
            }
            Err(e) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into())
            }
        };

        if let Some(meta) = Self::read_meta(path) {
            let hash = blake3::hash(&bytes).to_hex().to_string();
            if hash != meta.data_hash {
                return Err(DataError::Other(format!(
                    "cache file {} does not match its sidecar hash",
                    path.display()
                )));
            }
        }

        decode_csv(&bytes)
    }

    /// The sidecar for a cache file, if present and readable.
    pub fn read_meta(path: &Path) -> Option<CacheMeta> {
        let content = fs::read_to_string(Self::meta_path(path)).ok()?;
        match serde_json::from_str(&content) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(path = %path.display(), "ignoring unreadable cache sidecar: {e}");
                None
            }
        }
    }

    /// Cache files in the directory, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| ArtifactError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(CACHE_SUFFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// The most recent cache file.
    pub fn latest(&self) -> Result<PathBuf, DataError> {
        self.list()?
            .pop()
            .ok_or_else(|| DataError::NoCachedData {
                dir: self.cache_dir.display().to_string(),
            })
    }
}

fn encode_csv(rows: &[PriceRow]) -> Result<Vec<u8>, DataError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(CsvRecord::from(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| DataError::Other(format!("CSV flush failed: {e}")))
}

fn decode_csv(bytes: &[u8]) -> Result<PriceCache, DataError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.deserialize::<CsvRecord>() {
        rows.push(PriceRow::try_from(record?)?);
    }
    Ok(PriceCache::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceCache {
        PriceCache::new(vec![
            PriceRow {
                symbol: "SPY".into(),
                date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                open: 527.0,
                high: 529.5,
                low: 522.6,
                close: 527.8,
                volume: Some(46_835_700),
            },
            PriceRow {
                symbol: "DXY".into(),
                date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
                open: 104.1,
                high: 104.3,
                low: 103.9,
                close: 104.2,
                volume: None,
            },
        ])
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCacheStore::new(dir.path());
        let path = store.write(day(), &sample(), "test", false).unwrap();

        assert!(path.ends_with("20240604_tickers.csv"));
        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("timestamp,symbol,open,high,low,close,volume"));

        let loaded = CsvCacheStore::load(&path).unwrap();
        assert_eq!(loaded, sample());

        let meta = CsvCacheStore::read_meta(&path).unwrap();
        assert_eq!(meta.tickers, vec!["DXY", "SPY"]);
        assert_eq!(meta.row_count, 2);
    }

    #[test]
    fn second_write_same_day_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCacheStore::new(dir.path());
        store.write(day(), &sample(), "test", false).unwrap();
        let err = store.write(day(), &sample(), "test", false).unwrap_err();
        assert!(matches!(
            err,
            DataError::Artifact(ArtifactError::AlreadyExists { .. })
        ));
        store.write(day(), &sample(), "test", true).unwrap();
    }

    #[test]
    fn tampered_file_fails_hash_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCacheStore::new(dir.path());
        let path = store.write(day(), &sample(), "test", false).unwrap();
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("2024-06-05,SPY,1,1,1,1,1\n");
        fs::write(&path, content).unwrap();
        assert!(CsvCacheStore::load(&path).is_err());
    }

    #[test]
    fn loads_rfc3339_timestamps_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20240101_tickers.csv");
        fs::write(
            &path,
            "timestamp,symbol,open,high,low,close,volume\n\
             2024-01-02T00:00:00-05:00,GLD,190,191,189,190.5,\n",
        )
        .unwrap();
        let cache = CsvCacheStore::load(&path).unwrap();
        assert_eq!(cache.rows()[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(cache.rows()[0].volume, None);
    }

    #[test]
    fn latest_picks_newest_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCacheStore::new(dir.path());
        store
            .write(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), &sample(), "t", false)
            .unwrap();
        store.write(day(), &sample(), "t", false).unwrap();
        assert!(store.latest().unwrap().ends_with("20240604_tickers.csv"));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn missing_cache_file_is_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvCacheStore::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DataError::Artifact(ArtifactError::Missing { .. })));
        let err = CsvCacheStore::new(dir.path()).latest().unwrap_err();
        assert!(matches!(err, DataError::NoCachedData { .. }));
    }
}
