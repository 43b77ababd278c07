//! Story payload and the generator that builds it from the price cache.

pub mod generate;
pub mod payload;

pub use generate::{generate_story, StoryConfig, StoryError, DISCLAIMER};
pub use payload::{Segment, StoryLoadError, StoryPayload};
