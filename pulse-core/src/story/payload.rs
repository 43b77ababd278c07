//! `story.json`: the canonical cross-stage contract.
//!
//! Segment order is significant: narration, video, and subtitles all walk
//! `segments` front to back.

use crate::artifact::{self, ArtifactError};
use crate::facts::FactSet;
use crate::schema::{check_duration, check_unique_ids, seconds_to_duration, SchemaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// One narrated unit of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Segment {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub facts: Vec<String>,
    /// Explicit duration override; `null` defers to the timing template.
    #[serde(default)]
    pub duration_s: Option<f64>,
}

impl Segment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tickers: Vec::new(),
            facts: Vec::new(),
            duration_s: None,
        }
    }

    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_facts<I, S>(mut self, facts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts = facts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duration_s(mut self, seconds: f64) -> Self {
        self.duration_s = Some(seconds);
        self
    }

    pub fn duration_override(&self) -> Option<Duration> {
        self.duration_s.map(seconds_to_duration)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoryPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// The fact set the segments were written from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<FactSet>,
    pub segments: Vec<Segment>,
}

impl StoryPayload {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            title: String::new(),
            summary: String::new(),
            generated_at: None,
            facts: None,
            segments,
        }
    }

    /// Parse and shape-check a payload.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let story: Self = serde_json::from_str(json)?;
        story.check_shape()?;
        Ok(story)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load `story.json`. A missing file is a hard failure.
    pub fn load(path: &Path) -> Result<Self, StoryLoadError> {
        let content = artifact::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Write atomically as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        artifact::write_json(path, self)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every ticker referenced by any segment.
    pub fn referenced_tickers(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .flat_map(|s| s.tickers.iter().map(String::as_str))
            .collect()
    }

    /// Content fingerprint (BLAKE3 over the canonical JSON).
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    fn check_shape(&self) -> Result<(), SchemaError> {
        check_unique_ids("segment", self.segments.iter().map(|s| s.id.as_str()))?;
        for segment in &self.segments {
            if let Some(d) = segment.duration_s {
                check_duration(format!("segments[{}].duration_s", segment.id), d)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoryLoadError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid story payload: {0}")]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_payload() {
        let story = StoryPayload::from_json(
            r#"{"segments":[{"id":"intro","text":"Hello","tickers":[],"duration_s":null},
                            {"id":"spy","text":"SPY up","tickers":["SPY"],"duration_s":4.5}]}"#,
        )
        .unwrap();
        assert_eq!(story.len(), 2);
        assert_eq!(story.segments[0].duration_s, None);
        assert_eq!(
            story.segments[1].duration_override(),
            Some(Duration::from_secs_f64(4.5))
        );
        assert_eq!(story.referenced_tickers().into_iter().collect::<Vec<_>>(), vec!["SPY"]);
    }

    #[test]
    fn rejects_override_too_large_for_the_clock() {
        let err = StoryPayload::from_json(
            r#"{"segments":[{"id":"a","text":"x","duration_s":1e300}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDuration { .. }));
    }

    #[test]
    fn rejects_unknown_segment_field() {
        let err = StoryPayload::from_json(
            r#"{"segments":[{"id":"a","text":"x","symbol":"SPY"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn rejects_legacy_bullets_shape() {
        let err = StoryPayload::from_json(r#"{"title":"t","bullets":[{"text":"x"}]}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn rejects_duplicate_segment_ids() {
        let err = StoryPayload::from_json(
            r#"{"segments":[{"id":"a","text":"x"},{"id":"a","text":"y"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId { .. }));
    }

    #[test]
    fn rejects_negative_override() {
        let err = StoryPayload::from_json(
            r#"{"segments":[{"id":"a","text":"x","duration_s":-2}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDuration { .. }));
    }

    #[test]
    fn round_trip_preserves_order() {
        let story = StoryPayload::new(vec![
            Segment::new("c", "third"),
            Segment::new("a", "first").with_tickers(["SPY"]),
            Segment::new("b", "second").with_duration_s(2.25),
        ]);
        let parsed = StoryPayload::from_json(&story.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, story);
        let ids: Vec<&str> = parsed.segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = StoryPayload::new(vec![Segment::new("a", "x")]);
        let b = StoryPayload::new(vec![Segment::new("a", "y")]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
