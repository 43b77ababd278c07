//! Parse-time schema checks shared by the JSON artifacts.
//!
//! serde rejects unknown fields and wrong types; the checks here cover what
//! the type system cannot express (finite, non-negative durations, unique ids).

use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Shape errors raised while parsing a story, timing template, or chart meta.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: String, value: f64 },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },

    #[error("timing slots sum to {slots_s}s but total_duration_s is {total_s}s")]
    SlotsExceedTotal { slots_s: f64, total_s: f64 },

    #[error("chart '{id}' has invalid dimensions {width}x{height}")]
    InvalidDimensions { id: String, width: u32, height: u32 },
}

/// Tolerance for comparing sums of f64 seconds.
pub const DURATION_EPSILON_S: f64 = 1e-6;

/// Seconds as a `Duration`, saturating at `Duration::MAX`. Negative and NaN
/// values map to zero.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

pub(crate) fn check_duration(field: impl Into<String>, value: f64) -> Result<(), SchemaError> {
    if value.is_finite() && value >= 0.0 && Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(SchemaError::InvalidDuration {
            field: field.into(),
            value,
        })
    }
}

pub(crate) fn check_unique_ids<'a>(
    kind: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(SchemaError::EmptyId { kind });
        }
        if !seen.insert(id) {
            return Err(SchemaError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
