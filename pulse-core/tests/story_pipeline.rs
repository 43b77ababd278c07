//! Fetch -> cache -> story -> validate, end to end on fixture data.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use pulse_core::contract::ReferenceKind;
use pulse_core::data::{
    fetch_prices, CsvCacheStore, DataError, DataProvider, DataSource, FetchConfig, FetchResult,
    LogProgress, LookbackPeriod,
};
use pulse_core::story::{generate_story, StoryConfig, DISCLAIMER};
use pulse_core::{
    validate, ContractError, KnownReferences, LayoutHint, PriceRow, StoryPayload, Timeline,
    TimingTemplate,
};
use std::path::PathBuf;
use std::time::Duration;

/// Canned provider: each ticker drifts by a fixed step per bar.
struct DriftProvider;

impl DriftProvider {
    const TICKERS: [(&'static str, f64); 6] = [
        ("SPY", 0.2),
        ("QQQ", 0.9),
        ("GLD", -0.6),
        ("TLT", 0.4),
        ("DXY", -0.1),
        ("USO", 1.6),
    ];
}

impl DataProvider for DriftProvider {
    fn name(&self) -> &str {
        "drift"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let (_, step) = Self::TICKERS
            .iter()
            .find(|(t, _)| *t == symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let mut rows = Vec::new();
        let mut day = start;
        let mut close = 100.0;
        while day <= end {
            rows.push(PriceRow {
                symbol: symbol.to_string(),
                date: day,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: Some(1_000_000),
            });
            close += step;
            day = day + Days::new(1);
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            rows,
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn template(name: &str) -> TimingTemplate {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../templates")
        .join(name);
    TimingTemplate::load(&path).unwrap()
}

fn story_config() -> StoryConfig {
    StoryConfig {
        generated_at: Utc.with_ymd_and_hms(2024, 6, 4, 21, 0, 0).unwrap(),
        ..StoryConfig::default()
    }
}

#[test]
fn fetched_cache_produces_a_valid_story() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvCacheStore::new(dir.path().join("cache"));
    let config = FetchConfig {
        tickers: DriftProvider::TICKERS.iter().map(|(t, _)| t.to_string()).collect(),
        period: LookbackPeriod::days(20),
        end: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
        raw_dir: None,
        force: false,
    };
    let summary = fetch_prices(&DriftProvider, &store, &config, &LogProgress).unwrap();
    let cache = CsvCacheStore::load(&summary.cache_path).unwrap();
    assert_eq!(cache.tickers().len(), 6);

    let timing = template("video_timing.json");
    let story = generate_story(&cache, &timing, &story_config()).unwrap();

    assert_eq!(story.len(), timing.slot_count());
    assert_eq!(story.segments[0].text, "Market Pulse — Jun 04, 2024");
    assert_eq!(story.segments.last().unwrap().text, DISCLAIMER);
    // USO moves the most, so it leads the scenes
    assert!(story.segments[1].text.starts_with("USO closed +"));
    assert!(story.summary.starts_with("USO "));

    let story_path = dir.path().join("story.json");
    story.write(&story_path).unwrap();
    let reloaded = StoryPayload::load(&story_path).unwrap();
    assert_eq!(reloaded, story);

    validate(&reloaded, &timing, &KnownReferences::from_story(&reloaded)).unwrap();
    let timeline = Timeline::build(&reloaded, &timing);
    assert_eq!(timeline.total(), Duration::from_secs(30));
    assert_eq!(timeline.entries[0].layout, LayoutHint::Title);
}

#[test]
fn short_template_with_too_few_tickers_fails() {
    let cache = pulse_core::PriceCache::new(
        (0..3)
            .map(|i| PriceRow {
                symbol: "SPY".into(),
                date: NaiveDate::from_ymd_opt(2024, 6, 1 + i).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0 + i as f64,
                volume: Some(10),
            })
            .collect(),
    );
    let timing = template("video_timing_short.json");
    assert!(generate_story(&cache, &timing, &story_config()).is_err());
}

fn three_slot_timing() -> TimingTemplate {
    TimingTemplate::from_json(
        r#"{"slots":[{"id":"a","duration_s":5},{"id":"b","duration_s":5},{"id":"c","duration_s":5}],
            "total_duration_s":15}"#,
    )
    .unwrap()
}

fn known() -> KnownReferences {
    KnownReferences::new(["SPY", "QQQ", "GLD"], ["SPY.pct_change"])
}

#[test]
fn hand_written_story_resolves_to_slot_durations() {
    let story = StoryPayload::from_json(
        r#"{"title":"t","summary":"s","segments":[
            {"id":"1","text":"one","tickers":["SPY"],"facts":["SPY.pct_change"],"duration_s":null},
            {"id":"2","text":"two","tickers":["QQQ"]},
            {"id":"3","text":"three"}]}"#,
    )
    .unwrap();
    let timing = three_slot_timing();
    validate(&story, &timing, &known()).unwrap();
    let timeline = Timeline::build(&story, &timing);
    assert!(timeline
        .entries
        .iter()
        .all(|e| e.duration() == Duration::from_secs(5)));
}

#[test]
fn each_contract_failure_is_reported() {
    let timing = three_slot_timing();

    let four = StoryPayload::from_json(
        r#"{"segments":[{"id":"1","text":""},{"id":"2","text":""},{"id":"3","text":""},{"id":"4","text":""}]}"#,
    )
    .unwrap();
    assert_eq!(
        validate(&four, &timing, &known()),
        Err(ContractError::SegmentCountMismatch {
            segments: 4,
            slots: 3
        })
    );

    let unknown = StoryPayload::from_json(
        r#"{"segments":[{"id":"1","text":"","tickers":["ZZZZ"]},{"id":"2","text":""},{"id":"3","text":""}]}"#,
    )
    .unwrap();
    assert!(matches!(
        validate(&unknown, &timing, &known()),
        Err(ContractError::MissingReference { kind: ReferenceKind::Ticker, ref reference, .. })
            if reference == "ZZZZ"
    ));

    let long = StoryPayload::from_json(
        r#"{"segments":[{"id":"1","text":"","duration_s":10},{"id":"2","text":""},{"id":"3","text":""}]}"#,
    )
    .unwrap();
    assert!(matches!(
        validate(&long, &timing, &known()),
        Err(ContractError::DurationOverflow { total_s, .. }) if (total_s - 20.0).abs() < 1e-9
    ));
}

#[test]
fn unknown_fields_are_rejected_at_parse_time() {
    assert!(StoryPayload::from_json(r#"{"segments":[],"extra":1}"#).is_err());
    assert!(TimingTemplate::from_json(r#"{"slots":[],"total_duration_s":1,"fps":30}"#).is_err());
}
