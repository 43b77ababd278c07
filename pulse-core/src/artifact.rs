//! Write-once artifact files.
//!
//! Every stage writes its output through `write_atomic`: the bytes land in a
//! sibling `.tmp` file which is renamed into place, so a failed stage never
//! leaves a partial artifact behind for a downstream reader.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("required artifact missing: {path}")]
    Missing { path: PathBuf },

    #[error("artifact already exists: {path} (pass --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read an input artifact, treating absence as a hard dependency failure.
pub fn read_to_string(path: &Path) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))
}

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write bytes to `path` via temp file + rename. Parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, bytes).map_err(|e| ArtifactError::io(&tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ArtifactError::io(path, e)
    })
}

/// Like `write_atomic`, but refuses to replace an existing file unless `force`.
pub fn write_once(path: &Path, bytes: &[u8], force: bool) -> Result<(), ArtifactError> {
    if !force && path.exists() {
        return Err(ArtifactError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    write_atomic(path, bytes)
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
