//! The story/timing contract.
//!
//! Narration, video, and subtitles are rendered by three independent stages
//! that only share `story.json` and the timing template. A count or duration
//! mismatch between the two silently corrupts all three outputs, so every
//! consumer runs `validate` before writing anything and derives its timings
//! from the same `Timeline`.
//!
//! Validation failures are never corrected here: the fix is to regenerate
//! the story payload.

use crate::domain::PriceCache;
use crate::facts::FactSet;
use crate::schema::DURATION_EPSILON_S;
use crate::story::{Segment, StoryPayload};
use crate::timing::{LayoutHint, TimingTemplate};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("story has {segments} segments but the timing template has {slots} slots")]
    SegmentCountMismatch { segments: usize, slots: usize },

    #[error("segment durations sum to {total_s:.3}s, exceeding the template's {allowed_s:.3}s")]
    DurationOverflow { total_s: f64, allowed_s: f64 },

    #[error("segment '{segment}' references unknown {kind} '{reference}'")]
    MissingReference {
        segment: String,
        kind: ReferenceKind,
        reference: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Ticker,
    Fact,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Ticker => write!(f, "ticker"),
            ReferenceKind::Fact => write!(f, "fact"),
        }
    }
}

/// Tickers and fact ids a story is allowed to reference: the contents of the
/// price cache and fact set it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownReferences {
    tickers: BTreeSet<String>,
    facts: BTreeSet<String>,
}

impl KnownReferences {
    pub fn new<T, F>(tickers: T, facts: F) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            facts: facts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_cache(cache: &PriceCache) -> Self {
        Self {
            tickers: cache.tickers(),
            facts: BTreeSet::new(),
        }
    }

    pub fn from_cache_and_facts(cache: &PriceCache, facts: &FactSet) -> Self {
        Self {
            tickers: cache.tickers(),
            facts: facts.fact_ids(),
        }
    }

    /// References recorded inside the story itself (its embedded fact set).
    ///
    /// Used when the originating cache is not at hand: tickers are taken from
    /// the fact set, so a story without one can only reference nothing.
    pub fn from_story(story: &StoryPayload) -> Self {
        match &story.facts {
            Some(facts) => Self {
                tickers: facts.tickers.iter().map(|t| t.ticker.clone()).collect(),
                facts: facts.fact_ids(),
            },
            None => Self::default(),
        }
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn has_fact(&self, fact: &str) -> bool {
        self.facts.contains(fact)
    }
}

/// Duration of the segment at `position`: its own override if set, otherwise
/// the duration of the slot at the same position. A position with neither
/// resolves to zero.
pub fn resolve_duration(segment: &Segment, timing: &TimingTemplate, position: usize) -> Duration {
    segment
        .duration_override()
        .or_else(|| timing.slot(position).map(|slot| slot.duration()))
        .unwrap_or(Duration::ZERO)
}

/// Resolved durations for every segment, in story order.
pub fn resolved_durations(story: &StoryPayload, timing: &TimingTemplate) -> Vec<Duration> {
    story
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| resolve_duration(seg, timing, i))
        .collect()
}

/// Check a story against a timing template and the references it was built from.
///
/// Checks run in order (segment count, total duration, references); the
/// first failure is returned.
pub fn validate(
    story: &StoryPayload,
    timing: &TimingTemplate,
    known: &KnownReferences,
) -> Result<(), ContractError> {
    if story.segments.len() != timing.slot_count() {
        return Err(ContractError::SegmentCountMismatch {
            segments: story.segments.len(),
            slots: timing.slot_count(),
        });
    }

    let total_s: f64 = story
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            seg.duration_s
                .or_else(|| timing.slot(i).map(|slot| slot.duration_s))
                .unwrap_or(0.0)
        })
        .sum();
    if total_s > timing.total_duration_s + DURATION_EPSILON_S {
        return Err(ContractError::DurationOverflow {
            total_s,
            allowed_s: timing.total_duration_s,
        });
    }

    for segment in &story.segments {
        if let Some(ticker) = segment.tickers.iter().find(|t| !known.has_ticker(t)) {
            return Err(ContractError::MissingReference {
                segment: segment.id.clone(),
                kind: ReferenceKind::Ticker,
                reference: ticker.clone(),
            });
        }
        if let Some(fact) = segment.facts.iter().find(|f| !known.has_fact(f)) {
            return Err(ContractError::MissingReference {
                segment: segment.id.clone(),
                kind: ReferenceKind::Fact,
                reference: fact.clone(),
            });
        }
    }

    Ok(())
}

/// One segment placed on the shared clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub index: usize,
    pub segment_id: String,
    pub layout: LayoutHint,
    pub text: String,
    pub tickers: Vec<String>,
    pub start: Duration,
    pub end: Duration,
}

impl TimelineEntry {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Cumulative start/end times for every segment of a validated story.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Lay a story out on the clock. Call `validate` first; this does not
    /// re-check the contract.
    pub fn build(story: &StoryPayload, timing: &TimingTemplate) -> Self {
        let mut cursor = Duration::ZERO;
        let entries = story
            .segments
            .iter()
            .enumerate()
            .map(|(index, seg)| {
                let start = cursor;
                cursor = cursor.saturating_add(resolve_duration(seg, timing, index));
                TimelineEntry {
                    index,
                    segment_id: seg.id.clone(),
                    layout: timing.slot(index).map(|s| s.layout).unwrap_or_default(),
                    text: seg.text.clone(),
                    tickers: seg.tickers.clone(),
                    start,
                    end: cursor,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn total(&self) -> Duration {
        self.entries.last().map(|e| e.end).unwrap_or(Duration::ZERO)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::Slot;

    fn three_slots() -> TimingTemplate {
        TimingTemplate::from_json(
            r#"{"slots":[{"id":"s1","duration_s":5},{"id":"s2","duration_s":5},{"id":"s3","duration_s":5}],
                "total_duration_s":15}"#,
        )
        .unwrap()
    }

    fn story(n: usize) -> StoryPayload {
        StoryPayload::new(
            (0..n)
                .map(|i| Segment::new(format!("seg{i}"), format!("text {i}")).with_tickers(["SPY"]))
                .collect(),
        )
    }

    fn known() -> KnownReferences {
        KnownReferences::new(["SPY", "GLD"], ["SPY.pct_change"])
    }

    #[test]
    fn three_segments_three_slots_validates() {
        let timing = three_slots();
        let story = story(3);
        assert_eq!(validate(&story, &timing, &known()), Ok(()));
        for (i, seg) in story.segments.iter().enumerate() {
            assert_eq!(resolve_duration(seg, &timing, i), Duration::from_secs(5));
        }
    }

    #[test]
    fn four_segments_three_slots_is_count_mismatch() {
        let err = validate(&story(4), &three_slots(), &known()).unwrap_err();
        assert_eq!(
            err,
            ContractError::SegmentCountMismatch {
                segments: 4,
                slots: 3
            }
        );
    }

    #[test]
    fn unknown_ticker_is_missing_reference() {
        let mut s = story(3);
        s.segments[1].tickers = vec!["ZZZZ".into()];
        let err = validate(&s, &three_slots(), &known()).unwrap_err();
        assert!(matches!(
            err,
            ContractError::MissingReference { ref reference, kind: ReferenceKind::Ticker, .. }
                if reference == "ZZZZ"
        ));
    }

    #[test]
    fn unknown_fact_is_missing_reference() {
        let mut s = story(3);
        s.segments[0].facts = vec!["SPY.pct_change".into(), "SPY.rsi".into()];
        let err = validate(&s, &three_slots(), &known()).unwrap_err();
        assert!(matches!(
            err,
            ContractError::MissingReference { kind: ReferenceKind::Fact, .. }
        ));
    }

    #[test]
    fn overrides_summing_past_total_overflow() {
        let mut s = story(3);
        s.segments[0].duration_s = Some(10.0);
        s.segments[1].duration_s = Some(5.0);
        s.segments[2].duration_s = Some(5.0);
        let err = validate(&s, &three_slots(), &known()).unwrap_err();
        assert!(matches!(err, ContractError::DurationOverflow { total_s, .. } if total_s == 20.0));
    }

    #[test]
    fn huge_override_overflows_without_panicking() {
        let mut s = story(3);
        s.segments[0].duration_s = Some(1e300);
        let err = validate(&s, &three_slots(), &known()).unwrap_err();
        assert!(matches!(err, ContractError::DurationOverflow { total_s, .. } if total_s > 1e299));
        assert_eq!(resolve_duration(&s.segments[0], &three_slots(), 0), Duration::MAX);
    }

    #[test]
    fn huge_slot_and_total_validate_without_panicking() {
        let timing = TimingTemplate {
            slots: vec![
                Slot::new("s1", 1e300, LayoutHint::Scene),
                Slot::new("s2", 1e300, LayoutHint::Scene),
            ],
            total_duration_s: 1e300,
        };
        assert_eq!(timing.total_duration(), Duration::MAX);
        let err = validate(&story(2), &timing, &known()).unwrap_err();
        assert!(matches!(err, ContractError::DurationOverflow { .. }));
        let timeline = Timeline::build(&story(2), &timing);
        assert_eq!(timeline.total(), Duration::MAX);
        assert_eq!(timeline.entries[1].duration(), Duration::ZERO);
    }

    #[test]
    fn count_mismatch_is_reported_before_overflow() {
        let mut s = story(4);
        s.segments[0].duration_s = Some(100.0);
        let err = validate(&s, &three_slots(), &known()).unwrap_err();
        assert!(matches!(err, ContractError::SegmentCountMismatch { .. }));
    }

    #[test]
    fn override_wins_over_slot() {
        let seg = Segment::new("a", "x").with_duration_s(2.5);
        assert_eq!(
            resolve_duration(&seg, &three_slots(), 0),
            Duration::from_secs_f64(2.5)
        );
    }

    #[test]
    fn position_past_last_slot_resolves_to_zero() {
        let seg = Segment::new("a", "x");
        assert_eq!(resolve_duration(&seg, &three_slots(), 7), Duration::ZERO);
    }

    #[test]
    fn timeline_is_cumulative() {
        let mut s = story(3);
        s.segments[1].duration_s = Some(2.0);
        let timeline = Timeline::build(&s, &three_slots());
        let bounds: Vec<(u64, u64)> = timeline
            .entries
            .iter()
            .map(|e| (e.start.as_millis() as u64, e.end.as_millis() as u64))
            .collect();
        assert_eq!(bounds, vec![(0, 5000), (5000, 7000), (7000, 12000)]);
        assert_eq!(timeline.total(), Duration::from_secs(12));
    }

    #[test]
    fn known_references_from_story_facts() {
        let s = StoryPayload::new(vec![Segment::new("a", "x").with_tickers(["SPY"])]);
        assert!(!KnownReferences::from_story(&s).has_ticker("SPY"));
    }
}
