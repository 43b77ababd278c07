//! Video stage: story + timing + chart meta -> silent MP4 skeleton.
//!
//! Each segment is one still frame held for its resolved duration. Scenes
//! show the price chart of their first ticker; title and outro slots, and
//! scenes without a ticker, get a generated card.

pub mod encoder;
pub mod frames;

use encoder::{Encoder, EncoderError};
use pulse_core::artifact::{self, ArtifactError};
use pulse_core::{
    validate, ChartEntry, ChartKind, ChartMeta, ContractError, KnownReferences, LayoutHint,
    StoryPayload, Timeline, TimelineEntry, TimingTemplate,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const CONCAT_LIST_FILE: &str = "concat.txt";

#[derive(Debug, Error)]
pub enum VideoError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("segment '{segment}' shows {ticker} but chart meta has no price chart for it")]
    MissingChart { segment: String, ticker: String },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Where generated cards and the concat list go.
    pub frames_dir: PathBuf,
    pub output: PathBuf,
}

impl VideoConfig {
    pub fn new(frames_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            output: output.into(),
        }
    }
}

/// One still frame on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub segment_id: String,
    pub image: ChartEntry,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct VideoSummary {
    pub output: PathBuf,
    pub concat_list: PathBuf,
    pub frames: Vec<Frame>,
    pub duration: Duration,
}

fn card_for(
    entry: &TimelineEntry,
    story: &StoryPayload,
    frames_dir: &Path,
) -> Result<ChartEntry, ArtifactError> {
    let card = match entry.layout {
        LayoutHint::Title => {
            let heading = if story.title.trim().is_empty() {
                "Market Pulse"
            } else {
                story.title.as_str()
            };
            frames::title_card(heading, &story.summary)
        }
        LayoutHint::Outro | LayoutHint::Scene => frames::title_card(&entry.text, ""),
    };
    let path = frames_dir.join(format!("{:02}_{}.svg", entry.index, entry.segment_id));
    let (width, height) = (card.width(), card.height());
    artifact::write_atomic(&path, card.finish().as_bytes())?;
    debug!(path = %path.display(), "card written");
    Ok(ChartEntry {
        path,
        width,
        height,
        ticker: None,
        kind: ChartKind::TitleCard,
    })
}

/// Decide the image behind every timeline entry. Cards are written to
/// `frames_dir`; chart frames must already exist. Every chart lookup is
/// resolved before the first card is written.
pub fn plan_frames(
    timeline: &Timeline,
    story: &StoryPayload,
    charts: &ChartMeta,
    frames_dir: &Path,
) -> Result<Vec<Frame>, VideoError> {
    let chart_images = timeline
        .entries
        .iter()
        .map(|entry| match (entry.layout, entry.tickers.first()) {
            (LayoutHint::Scene, Some(ticker)) => charts
                .for_ticker(ticker, ChartKind::Price)
                .cloned()
                .map(Some)
                .ok_or_else(|| VideoError::MissingChart {
                    segment: entry.segment_id.clone(),
                    ticker: ticker.clone(),
                }),
            _ => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;

    timeline
        .entries
        .iter()
        .zip(chart_images)
        .map(|(entry, chart)| -> Result<Frame, VideoError> {
            let image = match chart {
                Some(image) => image,
                None => card_for(entry, story, frames_dir)?,
            };
            Ok(Frame {
                segment_id: entry.segment_id.clone(),
                image,
                duration: entry.duration(),
            })
        })
        .collect()
}

/// The concat demuxer resolves relative paths against the list file, so every
/// frame is listed by its absolute path.
fn absolute(path: &Path) -> Result<PathBuf, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        });
    }
    path.canonicalize().map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate, lay out frames, and write the concat list. Returns the frames
/// and the list path without encoding.
pub fn prepare(
    story: &StoryPayload,
    timing: &TimingTemplate,
    known: &KnownReferences,
    charts: &ChartMeta,
    config: &VideoConfig,
) -> Result<(Vec<Frame>, PathBuf), VideoError> {
    validate(story, timing, known)?;
    let timeline = Timeline::build(story, timing);
    let planned = plan_frames(&timeline, story, charts, &config.frames_dir)?;

    let resolved = planned
        .iter()
        .map(|f| -> Result<(PathBuf, Duration), ArtifactError> {
            Ok((absolute(&f.image.path)?, f.duration))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let listed: Vec<(&Path, Duration)> = resolved.iter().map(|(p, d)| (p.as_path(), *d)).collect();

    let list_path = config.frames_dir.join(CONCAT_LIST_FILE);
    artifact::write_atomic(&list_path, frames::concat_list(&listed).as_bytes())?;
    Ok((planned, list_path))
}

/// Build and encode the silent video skeleton.
pub fn render_skeleton(
    story: &StoryPayload,
    timing: &TimingTemplate,
    known: &KnownReferences,
    charts: &ChartMeta,
    encoder: &Encoder,
    config: &VideoConfig,
) -> Result<VideoSummary, VideoError> {
    let (frames, concat_list) = prepare(story, timing, known, charts, config)?;
    encoder.encode_concat(&concat_list, &config.output)?;

    let duration = frames
        .iter()
        .fold(Duration::ZERO, |acc, f| acc.saturating_add(f.duration));
    info!(
        path = %config.output.display(),
        frames = frames.len(),
        seconds = duration.as_secs_f64(),
        "video skeleton written"
    );
    Ok(VideoSummary {
        output: config.output.clone(),
        concat_list,
        frames,
        duration,
    })
}
