//! Burn a subtitle file into an existing video.

use super::SubtitleError;
use crate::video::encoder::Encoder;
use pulse_core::artifact::ArtifactError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BurnConfig {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    /// Narration muxed in as AAC; the output is cut to the shorter stream.
    pub audio: Option<PathBuf>,
    pub output: PathBuf,
}

fn require(path: &Path) -> Result<(), ArtifactError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        })
    }
}

pub fn burn_in(encoder: &Encoder, config: &BurnConfig) -> Result<(), SubtitleError> {
    require(&config.video)?;
    require(&config.subtitles)?;
    if let Some(audio) = &config.audio {
        require(audio)?;
    }
    encoder.burn_subtitles(
        &config.video,
        &config.subtitles,
        config.audio.as_deref(),
        &config.output,
    )?;
    Ok(())
}
