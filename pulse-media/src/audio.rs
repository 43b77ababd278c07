//! Narration track: one speech clip per segment, fitted to the timeline.
//!
//! Every clip is decoded, downmixed to mono, resampled to the rate of the
//! first synthesized clip, then padded with silence or trimmed to its
//! segment's resolved duration. The concatenated track is exactly as long as
//! the timeline, so the video and subtitles line up with it.

use crate::speech::{SpeechError, SpeechSynthesizer, SynthesizedAudio};
use pulse_core::artifact::{self, ArtifactError};
use pulse_core::{validate, ContractError, KnownReferences, StoryPayload, Timeline, TimingTemplate};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Rate used when no segment produced speech (all-silent stories).
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("segment '{segment}': {source}")]
    Speech {
        segment: String,
        #[source]
        source: SpeechError,
    },

    #[error("WAV decode failed: {0}")]
    Decode(String),

    #[error("WAV encode failed: {0}")]
    Encode(#[from] hound::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Decode WAV bytes into mono `f32` samples in `[-1, 1]`.
///
/// A truncated data chunk (streamed WAV with a placeholder length) keeps the
/// samples read so far.
pub fn decode_mono(bytes: &[u8]) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map_while(Result::ok)
            .collect(),
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map_while(Result::ok)
                .map(|s| s as f32 / scale)
                .collect()
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Linear-interpolation resample.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let out_len = (samples.len() as u64 * to as u64 / from as u64) as usize;
    let step = from as f64 / to as f64;
    let last = samples.len() - 1;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

/// Number of samples covering `duration` at `sample_rate`.
pub fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Pad with silence or trim to exactly `len` samples.
pub fn fit_to_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}

/// Encode mono `f32` samples as 16-bit PCM WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[derive(Debug, Clone)]
pub struct NarrationSummary {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub duration: Duration,
    pub segments: usize,
}

/// Synthesize, fit, and write the narration track for a story.
///
/// The story is validated first; nothing is written unless every segment
/// synthesizes.
pub fn render_narration(
    story: &StoryPayload,
    timing: &TimingTemplate,
    known: &KnownReferences,
    synth: &dyn SpeechSynthesizer,
    output: &Path,
) -> Result<NarrationSummary, AudioError> {
    validate(story, timing, known)?;
    let timeline = Timeline::build(story, timing);

    let mut clips: Vec<Option<SynthesizedAudio>> = Vec::with_capacity(timeline.len());
    for entry in &timeline.entries {
        if entry.text.trim().is_empty() {
            clips.push(None);
            continue;
        }
        let audio = synth
            .synthesize(&entry.text)
            .map_err(|source| AudioError::Speech {
                segment: entry.segment_id.clone(),
                source,
            })?;
        clips.push(Some(audio));
    }

    let sample_rate = clips
        .iter()
        .flatten()
        .map(|c| c.sample_rate)
        .next()
        .unwrap_or(DEFAULT_SAMPLE_RATE);

    let mut track = Vec::with_capacity(samples_for(timeline.total(), sample_rate));
    for (entry, clip) in timeline.entries.iter().zip(clips) {
        let target = samples_for(entry.duration(), sample_rate);
        let samples = match clip {
            Some(clip) => {
                let (mono, rate) = decode_mono(&clip.audio_bytes)?;
                resample(&mono, rate, sample_rate)
            }
            None => Vec::new(),
        };
        if samples.len() > target {
            warn!(
                segment = %entry.segment_id,
                speech_s = samples.len() as f64 / sample_rate as f64,
                slot_s = entry.duration().as_secs_f64(),
                "speech longer than its slot, trimming"
            );
        }
        track.extend(fit_to_length(samples, target));
    }

    let bytes = encode_wav(&track, sample_rate)?;
    artifact::write_atomic(output, &bytes)?;

    let duration = Duration::from_secs_f64(track.len() as f64 / sample_rate as f64);
    info!(path = %output.display(), sample_rate, seconds = duration.as_secs_f64(), "narration written");
    Ok(NarrationSummary {
        path: output.to_path_buf(),
        sample_rate,
        duration,
        segments: timeline.len(),
    })
}
