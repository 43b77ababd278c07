//! Pulse Media — the rendering stages downstream of `story.json`.
//!
//! - Charts (SVG, optional interactive HTML) and `chart_meta.json`
//! - Speech synthesis backends and the narration track
//! - ASS/SRT subtitles and burn-in
//! - Silent video skeleton via ffmpeg
//! - Mobile thumbnail from a chart and a headline
//!
//! Every stage that consumes a story validates it against the timing
//! template before writing anything.

pub mod audio;
pub mod charts;
pub mod process;
pub mod speech;
pub mod subtitles;
pub mod thumbnail;
pub mod video;

pub use audio::{render_narration, AudioError, NarrationSummary};
pub use charts::{render_charts, ChartConfig, ChartError, ChartRun};
pub use speech::{
    Backend, FallbackEngine, PrimaryEngine, SpeechChain, SpeechError, SpeechSynthesizer,
    SynthesizedAudio,
};
pub use subtitles::{burn_in, write_subtitles, BurnConfig, SubtitleError, SubtitleFormat};
pub use thumbnail::{render_thumbnail, ThumbnailError};
pub use video::encoder::{Encoder, EncoderError};
pub use video::{render_skeleton, VideoConfig, VideoError, VideoSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn engines_are_send_sync() {
        assert_send::<PrimaryEngine>();
        assert_sync::<PrimaryEngine>();
        assert_send::<FallbackEngine>();
        assert_sync::<FallbackEngine>();
        assert_send::<SpeechChain>();
        assert_sync::<SpeechChain>();
    }

    #[test]
    fn stage_errors_are_send_sync() {
        assert_send::<AudioError>();
        assert_sync::<AudioError>();
        assert_send::<VideoError>();
        assert_sync::<VideoError>();
        assert_send::<ChartError>();
        assert_sync::<ChartError>();
        assert_send::<ThumbnailError>();
        assert_sync::<ThumbnailError>();
    }
}
