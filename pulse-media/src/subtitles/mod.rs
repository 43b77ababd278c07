//! Subtitle stage: story + timing -> ASS/SRT, and optional burn-in.

pub mod ass;
pub mod burn;
pub mod srt;

use crate::video::encoder::EncoderError;
use pulse_core::artifact::{self, ArtifactError};
use pulse_core::{validate, ContractError, KnownReferences, StoryPayload, Timeline, TimingTemplate};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub use burn::{burn_in, BurnConfig};

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubtitleFormat {
    #[default]
    Ass,
    Srt,
}

impl SubtitleFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Srt => "srt",
        }
    }

    pub fn render(self, timeline: &Timeline) -> String {
        match self {
            SubtitleFormat::Ass => ass::render(timeline),
            SubtitleFormat::Srt => srt::render(timeline),
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ass" => Ok(SubtitleFormat::Ass),
            "srt" => Ok(SubtitleFormat::Srt),
            other => Err(format!("unknown subtitle format '{other}' (expected ass or srt)")),
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Validate the story against the timing template and write subtitles.
///
/// Returns the number of cues written.
pub fn write_subtitles(
    story: &StoryPayload,
    timing: &TimingTemplate,
    known: &KnownReferences,
    format: SubtitleFormat,
    output: &Path,
) -> Result<usize, SubtitleError> {
    validate(story, timing, known)?;
    let timeline = Timeline::build(story, timing);
    let cues = timeline
        .entries
        .iter()
        .filter(|e| !e.text.trim().is_empty())
        .count();
    artifact::write_atomic(output, format.render(&timeline).as_bytes())?;
    info!(path = %output.display(), %format, cues, "subtitles written");
    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Segment;

    #[test]
    fn overflowing_story_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("subs.srt");
        let story = StoryPayload::new(vec![
            Segment::new("a", "one").with_duration_s(10.0),
            Segment::new("b", "two").with_duration_s(10.0),
        ]);
        let timing = TimingTemplate::standard(5.0, 5.0, 0, 5.0);
        let err = write_subtitles(&story, &timing, &KnownReferences::default(), SubtitleFormat::Srt, &out)
            .unwrap_err();
        assert!(matches!(err, SubtitleError::Contract(ContractError::DurationOverflow { .. })));
        assert!(!out.exists());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("SRT".parse::<SubtitleFormat>(), Ok(SubtitleFormat::Srt));
        assert!("vtt".parse::<SubtitleFormat>().is_err());
    }
}
