//! ffmpeg invocation.
//!
//! Argument lists are built by plain functions so they can be checked
//! without an encoder installed. Output goes to a temp file in the target
//! directory and is renamed into place once ffmpeg exits cleanly.

use crate::process::{run_tool, ToolError};
use pulse_core::ArtifactError;
use std::ffi::OsString;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

pub const FPS: u32 = 30;
pub const FRAME_SIZE: (u32, u32) = (720, 1280);

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    program: String,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl Encoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Encode an ffmpeg concat list into a silent H.264 MP4.
    pub fn encode_concat(&self, list: &Path, output: &Path) -> Result<(), EncoderError> {
        self.run_into(output, |tmp| concat_args(list, tmp))?;
        info!(path = %output.display(), "video encoded");
        Ok(())
    }

    /// Burn subtitles into `video`, optionally muxing a narration track.
    pub fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        audio: Option<&Path>,
        output: &Path,
    ) -> Result<(), EncoderError> {
        self.run_into(output, |tmp| burn_args(video, subtitles, audio, tmp))?;
        info!(path = %output.display(), "subtitles burned in");
        Ok(())
    }

    fn run_into<F>(&self, output: &Path, args: F) -> Result<(), EncoderError>
    where
        F: FnOnce(&Path) -> Vec<OsString>,
    {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let suffix = output
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let tmp = tempfile::Builder::new()
            .prefix(".pulse-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|source| ArtifactError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        run_tool(&self.program, args(tmp.path()))?;

        tmp.persist(output).map_err(|e| ArtifactError::Io {
            path: output.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

fn os(s: impl Into<OsString>) -> OsString {
    s.into()
}

/// Scale-to-fit, pad to the frame, fixed frame rate, yuv420p.
pub fn frame_filter() -> String {
    let (w, h) = FRAME_SIZE;
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={FPS},format=yuv420p"
    )
}

pub fn concat_args(list: &Path, output: &Path) -> Vec<OsString> {
    vec![
        os("-y"),
        os("-f"),
        os("concat"),
        os("-safe"),
        os("0"),
        os("-i"),
        list.as_os_str().to_owned(),
        os("-vf"),
        os(frame_filter()),
        os("-c:v"),
        os("libx264"),
        os("-pix_fmt"),
        os("yuv420p"),
        os("-r"),
        os(FPS.to_string()),
        output.as_os_str().to_owned(),
    ]
}

/// Escape a path for use as a filter option value.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn burn_args(
    video: &Path,
    subtitles: &Path,
    audio: Option<&Path>,
    output: &Path,
) -> Vec<OsString> {
    let mut args = vec![os("-y"), os("-i"), video.as_os_str().to_owned()];
    if let Some(audio) = audio {
        args.extend([os("-i"), audio.as_os_str().to_owned()]);
    }
    args.extend([
        os("-vf"),
        os(format!("subtitles={}", escape_filter_path(subtitles))),
        os("-map"),
        os("0:v:0"),
    ]);
    if audio.is_some() {
        args.extend([
            os("-map"),
            os("1:a:0"),
            os("-c:a"),
            os("aac"),
            os("-shortest"),
        ]);
    }
    args.extend([
        os("-c:v"),
        os("libx264"),
        os("-pix_fmt"),
        os("yuv420p"),
        output.as_os_str().to_owned(),
    ]);
    args
}
