//! Text-to-speech backends.
//!
//! Every engine returns the same shape: WAV bytes plus their sample rate.
//! `Backend::Auto` tries the primary engine first and falls back to the
//! secondary one; an explicit backend never falls back.

use crate::process::{run_tool, ToolError};
use std::ffi::OsString;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine '{engine}' is unavailable: {reason}")]
    Unavailable { engine: String, reason: String },

    #[error("speech engine '{engine}' failed: {reason}")]
    Failed { engine: String, reason: String },

    #[error("speech engine '{engine}' returned unreadable audio: {reason}")]
    InvalidAudio { engine: String, reason: String },

    #[error("no speech backend succeeded ({0})")]
    AllBackendsFailed(String),
}

impl SpeechError {
    fn from_tool(engine: &str, err: ToolError) -> Self {
        match err {
            ToolError::NotFound { .. } => SpeechError::Unavailable {
                engine: engine.to_string(),
                reason: err.to_string(),
            },
            other => SpeechError::Failed {
                engine: engine.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, SpeechError::Unavailable { .. })
    }
}

/// Synthesized speech: a complete WAV file and its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub audio_bytes: Vec<u8>,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    /// Wrap WAV bytes, reading the sample rate from the header.
    pub fn from_wav(engine: &str, audio_bytes: Vec<u8>) -> Result<Self, SpeechError> {
        let sample_rate = hound::WavReader::new(Cursor::new(&audio_bytes))
            .map(|r| r.spec().sample_rate)
            .map_err(|e| SpeechError::InvalidAudio {
                engine: engine.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            audio_bytes,
            sample_rate,
        })
    }
}

pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SpeechError>;
}

/// `espeak-ng`, writing WAV to stdout.
#[derive(Debug, Clone)]
pub struct PrimaryEngine {
    program: String,
    voice: String,
    words_per_minute: u32,
}

impl Default for PrimaryEngine {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            voice: "en-us".to_string(),
            words_per_minute: 160,
        }
    }
}

impl PrimaryEngine {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    fn args(&self, text: &str) -> Vec<String> {
        vec![
            "--stdout".to_string(),
            "-v".to_string(),
            self.voice.clone(),
            "-s".to_string(),
            self.words_per_minute.to_string(),
            text.to_string(),
        ]
    }
}

impl SpeechSynthesizer for PrimaryEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SpeechError> {
        let output =
            run_tool(&self.program, self.args(text)).map_err(|e| SpeechError::from_tool(self.name(), e))?;
        SynthesizedAudio::from_wav(self.name(), output.stdout)
    }
}

/// `pico2wave`, which only writes to a named `.wav` file.
#[derive(Debug, Clone)]
pub struct FallbackEngine {
    program: String,
    language: String,
}

impl Default for FallbackEngine {
    fn default() -> Self {
        Self {
            program: "pico2wave".to_string(),
            language: "en-US".to_string(),
        }
    }
}

impl FallbackEngine {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl SpeechSynthesizer for FallbackEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SpeechError> {
        let failed = |reason: String| SpeechError::Failed {
            engine: self.program.clone(),
            reason,
        };
        let tmp = tempfile::Builder::new()
            .prefix("pulse-tts-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| failed(e.to_string()))?;

        let args: [OsString; 5] = [
            "-l".into(),
            self.language.clone().into(),
            "-w".into(),
            tmp.path().as_os_str().to_owned(),
            text.into(),
        ];
        run_tool(&self.program, args)
            .map_err(|e| SpeechError::from_tool(self.name(), e))?;

        let bytes = std::fs::read(tmp.path()).map_err(|e| failed(e.to_string()))?;
        SynthesizedAudio::from_wav(self.name(), bytes)
    }
}

/// Engines tried in order until one succeeds.
pub struct SpeechChain {
    engines: Vec<Box<dyn SpeechSynthesizer>>,
}

impl SpeechChain {
    pub fn new(engines: Vec<Box<dyn SpeechSynthesizer>>) -> Self {
        Self { engines }
    }
}

impl SpeechSynthesizer for SpeechChain {
    fn name(&self) -> &str {
        "auto"
    }

    fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SpeechError> {
        let mut failures = Vec::new();
        for engine in &self.engines {
            match engine.synthesize(text) {
                Ok(audio) => {
                    debug!(engine = engine.name(), "speech synthesized");
                    return Ok(audio);
                }
                Err(e) if e.is_unavailable() => {
                    debug!(engine = engine.name(), "skipping: {e}");
                    failures.push(e.to_string());
                }
                Err(e) => {
                    warn!(engine = engine.name(), "falling back: {e}");
                    failures.push(e.to_string());
                }
            }
        }
        Err(SpeechError::AllBackendsFailed(failures.join("; ")))
    }
}

/// Which engine(s) the audio stage may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Auto,
    Primary,
    Fallback,
}

impl Backend {
    pub fn synthesizer(self) -> Box<dyn SpeechSynthesizer> {
        match self {
            Backend::Auto => Box::new(SpeechChain::new(vec![
                Box::new(PrimaryEngine::default()),
                Box::new(FallbackEngine::default()),
            ])),
            Backend::Primary => Box::new(PrimaryEngine::default()),
            Backend::Fallback => Box::new(FallbackEngine::default()),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "primary" => Ok(Backend::Primary),
            "fallback" => Ok(Backend::Fallback),
            other => Err(format!(
                "unknown backend '{other}' (expected auto, primary, or fallback)"
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Auto => "auto",
            Backend::Primary => "primary",
            Backend::Fallback => "fallback",
        };
        f.write_str(s)
    }
}
