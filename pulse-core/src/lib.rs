//! Pulse Core — price data, facts, and the story/timing contract.
//!
//! This crate holds everything the pipeline stages agree on:
//! - Domain types (price rows, per-ticker series)
//! - Dated CSV price cache and the Yahoo Finance fetcher
//! - Derived facts and rankings
//! - Story payload, timing template, and chart meta schemas
//! - The story/timing contract (`validate`, `resolve_duration`, `Timeline`)
//! - Signal detection and title candidates
//! - Pipeline configuration

pub mod artifact;
pub mod chart_meta;
pub mod config;
pub mod contract;
pub mod data;
pub mod domain;
pub mod facts;
pub mod schema;
pub mod signals;
pub mod story;
pub mod timing;

pub use artifact::ArtifactError;
pub use chart_meta::{ChartEntry, ChartKind, ChartMeta};
pub use config::{ConfigError, PipelineConfig};
pub use contract::{
    resolve_duration, resolved_durations, validate, ContractError, KnownReferences, Timeline,
    TimelineEntry,
};
pub use domain::{PriceCache, PriceRow, PriceSeries};
pub use facts::{FactSet, TickerFacts};
pub use schema::SchemaError;
pub use story::{Segment, StoryPayload};
pub use timing::{LayoutHint, Slot, TimingTemplate};
