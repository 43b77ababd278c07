//! Property tests for the story/timing contract.
//!
//! 1. `validate` succeeds iff counts match, durations fit, and references are known
//! 2. `resolve_duration` is pure: same inputs, same answer, no matter how often
//! 3. A story survives serialize -> parse unchanged, order included

use proptest::prelude::*;
use pulse_core::contract::ReferenceKind;
use pulse_core::timing::{LayoutHint, Slot};
use pulse_core::{
    resolve_duration, resolved_durations, validate, ContractError, KnownReferences, Segment,
    StoryPayload, Timeline, TimingTemplate,
};

const KNOWN_TICKERS: &[&str] = &["SPY", "QQQ", "GLD"];
const ALL_TICKERS: &[&str] = &["SPY", "QQQ", "GLD", "ZZZZ"];

// ── Strategies ───────────────────────────────────────────────────────

/// Half-second steps keep every sum exact in f64.
fn arb_secs() -> impl Strategy<Value = f64> {
    (0u32..40).prop_map(|n| n as f64 * 0.5)
}

fn arb_timing() -> impl Strategy<Value = TimingTemplate> {
    (prop::collection::vec(arb_secs(), 0..6), 0u32..20).prop_map(|(durations, slack)| {
        let slots: Vec<Slot> = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| Slot::new(format!("slot_{i}"), d, LayoutHint::Scene))
            .collect();
        let total = durations.iter().sum::<f64>() + slack as f64 * 0.5;
        TimingTemplate {
            slots,
            total_duration_s: total,
        }
    })
}

fn arb_segment(index: usize) -> impl Strategy<Value = Segment> {
    (
        prop::option::of(arb_secs()),
        prop::collection::vec(prop::sample::select(ALL_TICKERS), 0..3),
        any::<bool>(),
    )
        .prop_map(move |(dur, tickers, with_fact)| {
            let mut seg = Segment::new(format!("s{index}"), format!("segment {index}"))
                .with_tickers(tickers.iter().copied());
            if with_fact {
                if let Some(t) = tickers.first() {
                    seg = seg.with_facts([format!("{t}.pct_change")]);
                }
            }
            if let Some(d) = dur {
                seg = seg.with_duration_s(d);
            }
            seg
        })
}

fn arb_story() -> impl Strategy<Value = StoryPayload> {
    (0usize..6)
        .prop_flat_map(|n| (0..n).map(arb_segment).collect::<Vec<_>>())
        .prop_map(StoryPayload::new)
}

fn known() -> KnownReferences {
    KnownReferences::new(
        KNOWN_TICKERS.iter().copied(),
        KNOWN_TICKERS.iter().map(|t| format!("{t}.pct_change")),
    )
}

fn expected_ok(story: &StoryPayload, timing: &TimingTemplate) -> bool {
    if story.segments.len() != timing.slots.len() {
        return false;
    }
    let total: f64 = story
        .segments
        .iter()
        .zip(&timing.slots)
        .map(|(seg, slot)| seg.duration_s.unwrap_or(slot.duration_s))
        .sum();
    let refs_known = story.segments.iter().all(|seg| {
        seg.tickers.iter().all(|t| KNOWN_TICKERS.contains(&t.as_str()))
            && seg
                .facts
                .iter()
                .all(|f| KNOWN_TICKERS.iter().any(|t| *f == format!("{t}.pct_change")))
    });
    total <= timing.total_duration_s && refs_known
}

// ── 1. validate iff ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn validate_accepts_exactly_the_consistent_stories(
        story in arb_story(),
        timing in arb_timing(),
    ) {
        let result = validate(&story, &timing, &known());
        prop_assert_eq!(result.is_ok(), expected_ok(&story, &timing), "{:?}", result);
    }

    /// Count is checked before duration, duration before references.
    #[test]
    fn first_failing_check_wins(story in arb_story(), timing in arb_timing()) {
        match validate(&story, &timing, &known()) {
            Err(ContractError::SegmentCountMismatch { segments, slots }) => {
                prop_assert_ne!(segments, slots);
            }
            Err(ContractError::DurationOverflow { total_s, allowed_s }) => {
                prop_assert_eq!(story.segments.len(), timing.slots.len());
                prop_assert!(total_s > allowed_s);
            }
            Err(ContractError::MissingReference { kind, reference, .. }) => {
                prop_assert_eq!(story.segments.len(), timing.slots.len());
                match kind {
                    ReferenceKind::Ticker => prop_assert_eq!(reference, "ZZZZ"),
                    ReferenceKind::Fact => prop_assert_eq!(reference, "ZZZZ.pct_change"),
                }
            }
            Ok(()) => {}
        }
    }
}

// ── 2. resolve_duration purity ───────────────────────────────────────

proptest! {
    #[test]
    fn resolve_duration_is_pure(
        story in arb_story(),
        timing in arb_timing(),
        position in 0usize..8,
    ) {
        let Some(segment) = story.segments.first() else {
            return Ok(());
        };
        let before = (segment.clone(), timing.clone());
        let a = resolve_duration(segment, &timing, position);
        let b = resolve_duration(segment, &timing, position);
        prop_assert_eq!(a, b);
        prop_assert_eq!(&before.0, segment);
        prop_assert_eq!(&before.1, &timing);

        let expected = segment
            .duration_s
            .or_else(|| timing.slots.get(position).map(|s| s.duration_s))
            .unwrap_or(0.0);
        prop_assert!((a.as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn timeline_is_contiguous(story in arb_story(), timing in arb_timing()) {
        let timeline = Timeline::build(&story, &timing);
        let durations = resolved_durations(&story, &timing);
        prop_assert_eq!(timeline.len(), story.segments.len());
        let mut cursor = std::time::Duration::ZERO;
        for (entry, d) in timeline.entries.iter().zip(durations) {
            prop_assert_eq!(entry.start, cursor);
            prop_assert_eq!(entry.duration(), d);
            cursor = entry.end;
        }
        prop_assert_eq!(timeline.total(), cursor);
    }
}

// ── 3. Round-trip ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn story_round_trips_with_order(story in arb_story()) {
        let json = story.to_json_pretty().unwrap();
        let parsed = StoryPayload::from_json(&json).unwrap();
        let ids: Vec<&str> = parsed.segments.iter().map(|s| s.id.as_str()).collect();
        let expected: Vec<&str> = story.segments.iter().map(|s| s.id.as_str()).collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(parsed, story);
    }
}
