//! Story generator: price cache + timing template -> `story.json`.
//!
//! Slots are filled front to back by layout hint. Scene slots take tickers in
//! ranking order (largest absolute move first), so a template with fewer scene
//! slots than tickers narrates only the top movers.

use super::payload::{Segment, StoryPayload};
use crate::contract::{self, ContractError, KnownReferences};
use crate::domain::PriceCache;
use crate::facts::{self, FactSet, TickerFacts};
use crate::timing::{LayoutHint, TimingTemplate};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

pub const DISCLAIMER: &str = "End — Educational content. Not financial advice.";

/// Tickers named in the one-line summary.
const SUMMARY_TICKERS: usize = 4;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("price cache is empty")]
    EmptyCache,

    #[error("requested symbol '{0}' is not in the price cache")]
    UnknownSymbol(String),

    #[error("timing template has {scene_slots} scene slots but only {tickers} tickers have data")]
    NotEnoughTickers { scene_slots: usize, tickers: usize },

    #[error("generated story violates the timing contract: {0}")]
    Contract(#[from] ContractError),
}

/// Inputs for one story run.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Restrict to these tickers; `None` uses every cached ticker.
    pub symbols: Option<Vec<String>>,
    /// Bars in the percent-change window.
    pub lookback_days: usize,
    /// Ticker used for relative performance.
    pub benchmark: Option<String>,
    /// Stamped into the payload and used for the title date.
    pub generated_at: DateTime<Utc>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            symbols: None,
            lookback_days: 5,
            benchmark: Some("SPY".to_string()),
            generated_at: Utc::now(),
        }
    }
}

/// Build and validate a story. Nothing is written; the caller persists the
/// payload only after this returns `Ok`.
pub fn generate_story(
    cache: &PriceCache,
    timing: &TimingTemplate,
    config: &StoryConfig,
) -> Result<StoryPayload, StoryError> {
    if cache.is_empty() {
        return Err(StoryError::EmptyCache);
    }
    if let Some(symbols) = &config.symbols {
        if let Some(missing) = symbols.iter().find(|s| !cache.contains(s)) {
            return Err(StoryError::UnknownSymbol(missing.clone()));
        }
    }

    let fact_set = FactSet::compute(
        cache,
        config.symbols.as_deref(),
        config.lookback_days,
        config.benchmark.as_deref(),
    );
    let ranked = fact_set.ranked();

    let scene_slots = timing.count_layout(LayoutHint::Scene);
    if scene_slots > ranked.len() {
        return Err(StoryError::NotEnoughTickers {
            scene_slots,
            tickers: ranked.len(),
        });
    }

    let title = format!("Market Pulse — {}", config.generated_at.format("%b %d, %Y"));
    let mut movers = ranked.iter();
    let segments: Vec<Segment> = timing
        .slots
        .iter()
        .map(|slot| match slot.layout {
            LayoutHint::Title => Segment::new(slot.id.clone(), title.clone()),
            LayoutHint::Outro => Segment::new(slot.id.clone(), DISCLAIMER),
            LayoutHint::Scene => {
                // count checked above
                let facts = movers.next().copied();
                facts
                    .map(|f| scene_segment(&slot.id, f, fact_set.benchmark.as_deref()))
                    .unwrap_or_else(|| Segment::new(slot.id.clone(), ""))
            }
        })
        .collect();

    let summary = summary_line(&ranked);
    let story = StoryPayload {
        title,
        summary,
        generated_at: Some(config.generated_at),
        facts: Some(fact_set.clone()),
        segments,
    };

    contract::validate(
        &story,
        timing,
        &KnownReferences::from_cache_and_facts(cache, &fact_set),
    )?;

    info!(
        segments = story.len(),
        tickers = fact_set.tickers.len(),
        "story generated"
    );
    Ok(story)
}

/// One scene: `"GLD closed +1.23% at $190.40 (vs SPY +0.50%)"`.
fn scene_segment(slot_id: &str, f: &TickerFacts, benchmark: Option<&str>) -> Segment {
    let mut text = format!("{} closed {:+.2}% at ${:.2}", f.ticker, f.pct_change, f.close);
    let mut tickers = vec![f.ticker.clone()];
    let mut fact_refs = vec![
        facts::fact_id(&f.ticker, facts::FACT_PCT_CHANGE),
        facts::fact_id(&f.ticker, facts::FACT_CLOSE),
    ];

    if f.has_unusual_volume() {
        text.push_str(&format!(" — unusual volume: {:.1}x avg", f.vol_mult));
        fact_refs.push(facts::fact_id(&f.ticker, facts::FACT_VOL_MULT));
    }
    if let (Some(bench), Some(rel)) = (benchmark, f.rel_benchmark) {
        text.push_str(&format!(" (vs {bench} {rel:+.2}%)"));
        tickers.push(bench.to_string());
        fact_refs.push(facts::fact_id(&f.ticker, facts::FACT_REL_BENCHMARK));
    }

    debug!(slot = slot_id, ticker = %f.ticker, "scene written");
    Segment::new(slot_id, text)
        .with_tickers(tickers)
        .with_facts(fact_refs)
}

fn summary_line(ranked: &[&TickerFacts]) -> String {
    let parts: Vec<String> = ranked
        .iter()
        .take(SUMMARY_TICKERS)
        .map(|f| format!("{} {:+.2}%", f.ticker, f.pct_change))
        .collect();
    format!("{} — snapshot", parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceRow;
    use chrono::{NaiveDate, TimeZone};

    fn cache() -> PriceCache {
        let mut rows = Vec::new();
        for (ticker, first, last, last_vol) in [
            ("SPY", 100.0, 101.0, 100),
            ("GLD", 100.0, 105.0, 400),
            ("SLV", 100.0, 97.0, 100),
        ] {
            for (i, close) in [first, first, last].into_iter().enumerate() {
                rows.push(PriceRow {
                    symbol: ticker.into(),
                    date: NaiveDate::from_ymd_opt(2024, 5, 1 + i as u32).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Some(if i == 2 { last_vol } else { 100 }),
                });
            }
        }
        PriceCache::new(rows)
    }

    fn config() -> StoryConfig {
        StoryConfig {
            generated_at: Utc.with_ymd_and_hms(2024, 5, 3, 21, 0, 0).unwrap(),
            ..StoryConfig::default()
        }
    }

    #[test]
    fn fills_slots_in_template_order() {
        let timing = TimingTemplate::standard(3.0, 4.0, 2, 2.0);
        let story = generate_story(&cache(), &timing, &config()).unwrap();

        assert_eq!(story.len(), 4);
        assert_eq!(story.title, "Market Pulse — May 03, 2024");
        assert_eq!(story.segments[0].text, story.title);
        // GLD (+5%) outranks SLV (-3%) which outranks SPY (+1%)
        assert_eq!(story.segments[1].tickers[0], "GLD");
        assert_eq!(story.segments[2].tickers[0], "SLV");
        assert_eq!(story.segments[3].text, DISCLAIMER);
    }

    #[test]
    fn scene_text_mentions_volume_and_benchmark() {
        let timing = TimingTemplate::standard(3.0, 4.0, 1, 2.0);
        let story = generate_story(&cache(), &timing, &config()).unwrap();
        let scene = &story.segments[1];
        assert_eq!(
            scene.text,
            "GLD closed +5.00% at $105.00 — unusual volume: 4.0x avg (vs SPY +4.00%)"
        );
        assert_eq!(scene.tickers, vec!["GLD", "SPY"]);
        assert!(scene.facts.contains(&"GLD.vol_mult".to_string()));
        assert!(scene.facts.contains(&"GLD.rel_benchmark".to_string()));
    }

    #[test]
    fn summary_lists_top_movers() {
        let timing = TimingTemplate::standard(3.0, 4.0, 1, 2.0);
        let story = generate_story(&cache(), &timing, &config()).unwrap();
        assert_eq!(story.summary, "GLD +5.00% | SLV -3.00% | SPY +1.00% — snapshot");
    }

    #[test]
    fn too_many_scene_slots_fails() {
        let timing = TimingTemplate::standard(3.0, 4.0, 5, 2.0);
        let err = generate_story(&cache(), &timing, &config()).unwrap_err();
        assert!(matches!(
            err,
            StoryError::NotEnoughTickers {
                scene_slots: 5,
                tickers: 3
            }
        ));
    }

    #[test]
    fn unknown_symbol_fails() {
        let timing = TimingTemplate::standard(3.0, 4.0, 1, 2.0);
        let cfg = StoryConfig {
            symbols: Some(vec!["ZZZZ".into()]),
            ..config()
        };
        let err = generate_story(&cache(), &timing, &cfg).unwrap_err();
        assert!(matches!(err, StoryError::UnknownSymbol(s) if s == "ZZZZ"));
    }

    #[test]
    fn empty_cache_fails() {
        let timing = TimingTemplate::standard(3.0, 4.0, 0, 2.0);
        let err = generate_story(&PriceCache::default(), &timing, &config()).unwrap_err();
        assert!(matches!(err, StoryError::EmptyCache));
    }

    #[test]
    fn generated_story_embeds_its_facts() {
        let timing = TimingTemplate::standard(3.0, 4.0, 3, 2.0);
        let story = generate_story(&cache(), &timing, &config()).unwrap();
        let facts = story.facts.as_ref().unwrap();
        assert_eq!(facts.tickers.len(), 3);
        assert_eq!(facts.benchmark.as_deref(), Some("SPY"));
    }
}
