//! Market Pulse CLI — one subcommand per pipeline stage.
//!
//! Commands:
//! - `fetch` — download recent prices from Yahoo Finance into a dated CSV cache
//! - `story` — build `story.json` from the latest cache and a timing template
//! - `charts` — render per-ticker charts and `chart_meta.json`
//! - `signals` / `title` — detect signals and draft video titles
//! - `audio` — synthesize the narration track
//! - `subtitles ass|srt|burn` — write subtitles or burn them into a video
//! - `video` — encode the silent video skeleton
//! - `thumbnail` — lay a headline over a chart for the mobile thumbnail
//! - `run` — every stage above in order, chained through files in one directory
//! - `validate` — check a story against a timing template
//! - `cache status` — list cache files

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use pulse_core::data::{
    fetch_prices, normalize_tickers, CircuitBreaker, CsvCacheStore, FetchConfig, LogProgress,
    LookbackPeriod, YahooProvider,
};
use pulse_core::signals::{SignalReport, TitleSheet};
use pulse_core::story::{generate_story, StoryConfig};
use pulse_core::{
    validate, ChartEntry, ChartKind, ChartMeta, KnownReferences, LayoutHint, PipelineConfig,
    PriceCache, StoryPayload, Timeline, TimingTemplate,
};
use pulse_media::charts::CHART_META_FILE;
use pulse_media::{
    burn_in, render_charts, render_narration, render_skeleton, render_thumbnail, write_subtitles,
    Backend, BurnConfig, ChartConfig, Encoder, SubtitleFormat, VideoConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_TIMING: &str = "templates/video_timing.json";

#[derive(Parser)]
#[command(name = "pulse", about = "Market Pulse — short market videos from daily prices")]
struct Cli {
    /// Pipeline config (TOML). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every stage that consumes a story.
#[derive(Args, Debug, Clone)]
struct StoryInputs {
    /// Story payload.
    #[arg(long, default_value = "data/story.json")]
    story: PathBuf,

    /// Timing template. Defaults to the config's, then templates/video_timing.json.
    #[arg(long)]
    timing: Option<PathBuf>,

    /// Price cache the story was built from. Without it, references are
    /// checked against the facts embedded in the story.
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download recent prices and write a dated cache file.
    Fetch {
        /// Tickers (e.g. SPY QQQ GLD). Defaults to the config's list.
        tickers: Vec<String>,

        /// Lookback period: 30d, 6wk, 3mo, 1y.
        #[arg(long)]
        period: Option<String>,

        /// Last day to fetch (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Cache directory. Defaults to the config's.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Also keep the raw quote snapshot in this directory.
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Replace today's cache file if it exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Build story.json from a price cache.
    Story {
        /// Cache file. Defaults to the latest in the cache directory.
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Timing template.
        #[arg(long)]
        timing: Option<PathBuf>,

        /// Restrict to these tickers (comma separated).
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Bars in the percent-change window.
        #[arg(long)]
        lookback: Option<usize>,

        #[arg(long, default_value = "data/story.json")]
        output: PathBuf,

        /// Replace an existing story.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Render charts and chart_meta.json.
    Charts {
        /// Cache file. Defaults to the latest in the cache directory.
        #[arg(long)]
        cache: Option<PathBuf>,

        #[arg(long, default_value = "data/charts")]
        outdir: PathBuf,

        /// Restrict to these tickers (comma separated).
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Also write interactive HTML candlestick pages.
        #[arg(long, default_value_t = false)]
        interactive: bool,

        /// Rows in the top-movers table.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Detect MA crossovers, volume spikes, and benchmark divergence.
    Signals {
        /// Cache file. Defaults to the latest in the cache directory.
        #[arg(long)]
        cache: Option<PathBuf>,

        #[arg(long, default_value = "data/signals.json")]
        output: PathBuf,
    },
    /// Draft titles and thumbnail text from a signal report.
    Title {
        #[arg(long, default_value = "data/signals.json")]
        signals: PathBuf,

        #[arg(long, default_value = "data/title.json")]
        output: PathBuf,
    },
    /// Synthesize the narration track.
    Audio {
        #[command(flatten)]
        inputs: StoryInputs,

        /// Speech backend: auto, primary, fallback.
        #[arg(long, default_value = "auto")]
        backend: Backend,

        #[arg(long, default_value = "data/audio/narration.wav")]
        output: PathBuf,
    },
    /// Write subtitles or burn them into a video.
    Subtitles {
        #[command(subcommand)]
        action: SubtitleAction,
    },
    /// Encode the silent video skeleton.
    Video {
        #[command(flatten)]
        inputs: StoryInputs,

        #[arg(long = "chart_meta", visible_alias = "chart-meta", default_value = "data/charts/chart_meta.json")]
        chart_meta: PathBuf,

        /// Directory for generated cards and the concat list.
        #[arg(long, default_value = "data/frames")]
        outdir: PathBuf,

        #[arg(long, default_value = "data/video.mp4")]
        output: PathBuf,

        /// Encoder executable.
        #[arg(long, env = "PULSE_FFMPEG")]
        ffmpeg: Option<String>,
    },
    /// Lay a headline over a chart for the mobile thumbnail (640x1280 SVG).
    Thumbnail {
        /// Chart SVG to use as the background.
        #[arg(long)]
        chart: PathBuf,

        #[arg(long)]
        headline: String,

        /// Smaller line under the headline.
        #[arg(long)]
        subline: Option<String>,

        #[arg(long, default_value = "data/thumbnail.svg")]
        output: PathBuf,
    },
    /// Run every stage in order, each reading the files the previous one wrote.
    Run {
        /// Cache file. Defaults to the latest in the cache directory.
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Fetch today's prices first unless they are already cached.
        #[arg(long, default_value_t = false, conflicts_with = "cache")]
        fetch: bool,

        /// Timing template.
        #[arg(long)]
        timing: Option<PathBuf>,

        /// Run directory. Defaults to output/run_<timestamp>.
        #[arg(long)]
        outdir: Option<PathBuf>,

        /// Speech backend: auto, primary, fallback.
        #[arg(long, default_value = "auto")]
        backend: Backend,

        /// Skip narration; the final video carries no audio track.
        #[arg(long, default_value_t = false)]
        no_audio: bool,

        /// Stop before encoding (no video skeleton, no burn-in).
        #[arg(long, default_value_t = false)]
        no_video: bool,

        /// Encoder executable.
        #[arg(long, env = "PULSE_FFMPEG")]
        ffmpeg: Option<String>,
    },
    /// Check a story against a timing template and print its timeline.
    Validate {
        #[command(flatten)]
        inputs: StoryInputs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum SubtitleAction {
    /// Advanced SubStation Alpha.
    Ass {
        #[command(flatten)]
        inputs: StoryInputs,

        #[arg(long, default_value = "data/subs/story.ass")]
        output: PathBuf,
    },
    /// SubRip.
    Srt {
        #[command(flatten)]
        inputs: StoryInputs,

        #[arg(long, default_value = "data/subs/story.srt")]
        output: PathBuf,
    },
    /// Burn a subtitle file into a video, optionally muxing narration.
    Burn {
        #[arg(long, default_value = "data/video.mp4")]
        video: PathBuf,

        #[arg(long, default_value = "data/subs/story.ass")]
        subs: PathBuf,

        #[arg(long)]
        audio: Option<PathBuf>,

        #[arg(long, default_value = "data/final.mp4")]
        output: PathBuf,

        /// Encoder executable.
        #[arg(long, env = "PULSE_FFMPEG")]
        ffmpeg: Option<String>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cache files with their tickers, rows, and date ranges.
    Status {
        /// Cache directory. Defaults to the config's.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("failed to load pipeline config")?;

    match cli.command {
        Commands::Fetch {
            tickers,
            period,
            end,
            cache_dir,
            raw_dir,
            force,
        } => run_fetch(&config, tickers, period, end, cache_dir, raw_dir, force),
        Commands::Story {
            cache,
            timing,
            symbols,
            lookback,
            output,
            force,
        } => run_story(&config, cache, timing, symbols, lookback, &output, force),
        Commands::Charts {
            cache,
            outdir,
            symbols,
            interactive,
            top,
        } => run_charts(&config, cache, outdir, symbols, interactive, top),
        Commands::Signals { cache, output } => run_signals(&config, cache, &output),
        Commands::Title { signals, output } => run_title(&signals, &output),
        Commands::Audio {
            inputs,
            backend,
            output,
        } => run_audio(&config, &inputs, backend, &output),
        Commands::Subtitles { action } => match action {
            SubtitleAction::Ass { inputs, output } => {
                run_subtitles(&config, &inputs, SubtitleFormat::Ass, &output)
            }
            SubtitleAction::Srt { inputs, output } => {
                run_subtitles(&config, &inputs, SubtitleFormat::Srt, &output)
            }
            SubtitleAction::Burn {
                video,
                subs,
                audio,
                output,
                ffmpeg,
            } => {
                let encoder = encoder(&config, ffmpeg);
                let burn = BurnConfig {
                    video,
                    subtitles: subs,
                    audio,
                    output,
                };
                burn_in(&encoder, &burn).context("subtitle burn-in failed")?;
                println!("Wrote {}", burn.output.display());
                Ok(())
            }
        },
        Commands::Video {
            inputs,
            chart_meta,
            outdir,
            output,
            ffmpeg,
        } => run_video(&config, &inputs, &chart_meta, outdir, output, ffmpeg),
        Commands::Thumbnail {
            chart,
            headline,
            subline,
            output,
        } => {
            render_thumbnail(&chart, &headline, subline.as_deref(), &output)
                .context("thumbnail failed")?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        Commands::Run {
            cache,
            fetch,
            timing,
            outdir,
            backend,
            no_audio,
            no_video,
            ffmpeg,
        } => {
            let plan = RunPlan {
                cache,
                fetch,
                timing,
                outdir: outdir.unwrap_or_else(|| {
                    PathBuf::from("output").join(format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S")))
                }),
                backend,
                audio: !no_audio,
                video: !no_video,
                ffmpeg,
            };
            run_pipeline(&config, &plan)
        }
        Commands::Validate { inputs } => run_validate(&config, &inputs),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => {
                run_cache_status(cache_dir.as_deref().unwrap_or(&config.cache_dir))
            }
        },
    }
}

fn run_fetch(
    config: &PipelineConfig,
    tickers: Vec<String>,
    period: Option<String>,
    end: Option<String>,
    cache_dir: Option<PathBuf>,
    raw_dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let tickers = if tickers.is_empty() {
        config.tickers.clone()
    } else {
        tickers
    };
    let period: LookbackPeriod = period
        .as_deref()
        .unwrap_or(&config.period)
        .parse()
        .context("invalid --period")?;
    let end = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --end (expected YYYY-MM-DD)")?
        .unwrap_or_else(|| Utc::now().date_naive());

    let fetch = FetchConfig {
        tickers: normalize_tickers(tickers),
        period,
        end,
        raw_dir,
        force,
    };
    if fetch.tickers.is_empty() {
        bail!("no tickers to fetch");
    }

    let provider = YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    let store = CsvCacheStore::new(cache_dir.unwrap_or_else(|| config.cache_dir.clone()));
    let summary = fetch_prices(&provider, &store, &fetch, &LogProgress).context("fetch failed")?;

    println!(
        "Cached {} rows for {} tickers: {}",
        summary.rows,
        summary.quotes.len(),
        summary.cache_path.display()
    );
    for q in &summary.quotes {
        println!("  {:<6} {:>10.2} {:>+7.2}%", q.symbol, q.close, q.pct_change);
    }
    if let Some(raw) = &summary.raw_path {
        println!("Raw snapshot: {}", raw.display());
    }
    Ok(())
}

/// Explicit `--cache`, else the latest file in the configured directory.
fn load_cache(config: &PipelineConfig, cache: Option<&Path>) -> Result<(PathBuf, PriceCache)> {
    let path = match cache {
        Some(p) => p.to_path_buf(),
        None => CsvCacheStore::new(&config.cache_dir)
            .latest()
            .context("no price cache found (run `pulse fetch` first)")?,
    };
    let prices = CsvCacheStore::load(&path)
        .with_context(|| format!("failed to load price cache {}", path.display()))?;
    Ok((path, prices))
}

fn timing_path(config: &PipelineConfig, timing: Option<&Path>) -> PathBuf {
    timing
        .map(Path::to_path_buf)
        .or_else(|| config.timing.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TIMING))
}

fn load_timing(config: &PipelineConfig, timing: Option<&Path>) -> Result<TimingTemplate> {
    let path = timing_path(config, timing);
    TimingTemplate::load(&path)
        .with_context(|| format!("failed to load timing template {}", path.display()))
}

/// References a story may use: the cache it was built from when given,
/// otherwise the fact set embedded in the story.
fn known_references(story: &StoryPayload, cache: Option<&Path>) -> Result<KnownReferences> {
    match cache {
        Some(path) => {
            let prices = CsvCacheStore::load(path)
                .with_context(|| format!("failed to load price cache {}", path.display()))?;
            Ok(match &story.facts {
                Some(facts) => KnownReferences::from_cache_and_facts(&prices, facts),
                None => KnownReferences::from_cache(&prices),
            })
        }
        None => Ok(KnownReferences::from_story(story)),
    }
}

struct StageInputs {
    story: StoryPayload,
    timing: TimingTemplate,
    known: KnownReferences,
}

fn load_inputs(config: &PipelineConfig, inputs: &StoryInputs) -> Result<StageInputs> {
    let story = StoryPayload::load(&inputs.story)
        .with_context(|| format!("failed to load story {}", inputs.story.display()))?;
    let timing = load_timing(config, inputs.timing.as_deref())?;
    let known = known_references(&story, inputs.cache.as_deref())?;
    Ok(StageInputs {
        story,
        timing,
        known,
    })
}

fn encoder(config: &PipelineConfig, flag: Option<String>) -> Encoder {
    Encoder::new(flag.unwrap_or_else(|| config.ffmpeg.clone()))
}

fn non_empty(symbols: Vec<String>) -> Option<Vec<String>> {
    let symbols = normalize_tickers(symbols);
    (!symbols.is_empty()).then_some(symbols)
}

fn run_story(
    config: &PipelineConfig,
    cache: Option<PathBuf>,
    timing: Option<PathBuf>,
    symbols: Vec<String>,
    lookback: Option<usize>,
    output: &Path,
    force: bool,
) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            output.display()
        );
    }
    let (cache_path, prices) = load_cache(config, cache.as_deref())?;
    let timing = load_timing(config, timing.as_deref())?;
    let story_config = StoryConfig {
        symbols: non_empty(symbols),
        lookback_days: lookback.unwrap_or(config.lookback_days),
        benchmark: config.benchmark().map(str::to_string),
        generated_at: Utc::now(),
    };

    let story = generate_story(&prices, &timing, &story_config).context("story generation failed")?;
    story.write(output)?;
    info!(
        cache = %cache_path.display(),
        fingerprint = %story.fingerprint(),
        "story built"
    );
    println!("Wrote {} ({} segments)", output.display(), story.len());
    println!("{}", story.title);
    println!("{}", story.summary);
    Ok(())
}

fn run_charts(
    config: &PipelineConfig,
    cache: Option<PathBuf>,
    outdir: PathBuf,
    symbols: Vec<String>,
    interactive: bool,
    top: usize,
) -> Result<()> {
    let (_, prices) = load_cache(config, cache.as_deref())?;
    let mut chart_config = ChartConfig::new(outdir);
    chart_config.tickers = non_empty(symbols);
    chart_config.interactive = interactive;
    chart_config.top_n = top;

    let run = render_charts(&prices, &chart_config).context("chart rendering failed")?;
    println!(
        "Rendered {} charts; metadata: {}",
        run.meta.len(),
        run.meta_path.display()
    );
    Ok(())
}

fn run_signals(config: &PipelineConfig, cache: Option<PathBuf>, output: &Path) -> Result<()> {
    let (_, prices) = load_cache(config, cache.as_deref())?;
    let report = SignalReport::detect(&prices, config.benchmark(), Utc::now());
    report.write(output)?;

    if report.signals.is_empty() {
        println!("No signals fired.");
    }
    for t in &report.signals {
        for s in &t.signals {
            println!("  {}", s.narrative());
        }
    }
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_title(signals: &Path, output: &Path) -> Result<()> {
    let report = SignalReport::load(signals)
        .with_context(|| format!("failed to load signal report {}", signals.display()))?;
    let sheet = TitleSheet::from_report(&report);
    sheet.write(output)?;
    for c in &sheet.candidates {
        println!("{}", c.title);
    }
    println!("Wrote {} ({} candidates)", output.display(), sheet.candidates.len());
    Ok(())
}

fn run_audio(
    config: &PipelineConfig,
    inputs: &StoryInputs,
    backend: Backend,
    output: &Path,
) -> Result<()> {
    let stage = load_inputs(config, inputs)?;
    let synth = backend.synthesizer();
    let summary = render_narration(&stage.story, &stage.timing, &stage.known, synth.as_ref(), output)
        .with_context(|| format!("narration failed (backend: {backend})"))?;
    println!(
        "Wrote {} ({:.2}s @ {} Hz)",
        summary.path.display(),
        summary.duration.as_secs_f64(),
        summary.sample_rate
    );
    Ok(())
}

fn run_subtitles(
    config: &PipelineConfig,
    inputs: &StoryInputs,
    format: SubtitleFormat,
    output: &Path,
) -> Result<()> {
    let stage = load_inputs(config, inputs)?;
    let cues = write_subtitles(&stage.story, &stage.timing, &stage.known, format, output)
        .with_context(|| format!("{format} subtitles failed"))?;
    println!("Wrote {} ({cues} cues)", output.display());
    Ok(())
}

fn run_video(
    config: &PipelineConfig,
    inputs: &StoryInputs,
    chart_meta: &Path,
    outdir: PathBuf,
    output: PathBuf,
    ffmpeg: Option<String>,
) -> Result<()> {
    let stage = load_inputs(config, inputs)?;
    let charts = ChartMeta::load(chart_meta)
        .with_context(|| format!("failed to load chart meta {}", chart_meta.display()))?;
    let video_config = VideoConfig::new(outdir, output);
    let summary = render_skeleton(
        &stage.story,
        &stage.timing,
        &stage.known,
        &charts,
        &encoder(config, ffmpeg),
        &video_config,
    )
    .context("video encoding failed")?;
    println!(
        "Wrote {} ({} frames, {:.2}s)",
        summary.output.display(),
        summary.frames.len(),
        summary.duration.as_secs_f64()
    );
    Ok(())
}

fn run_validate(config: &PipelineConfig, inputs: &StoryInputs) -> Result<()> {
    let stage = load_inputs(config, inputs)?;
    validate(&stage.story, &stage.timing, &stage.known).context("story does not fit the timing template")?;

    let timeline = Timeline::build(&stage.story, &stage.timing);
    println!(
        "OK: {} segments, {:.2}s of {:.2}s",
        timeline.len(),
        timeline.total().as_secs_f64(),
        stage.timing.total_duration_s
    );
    println!("Fingerprint: {}", stage.story.fingerprint());
    println!("{:<12} {:>8} {:>8}  {}", "Segment", "Start", "End", "Tickers");
    println!("{}", "-".repeat(48));
    for e in &timeline.entries {
        println!(
            "{:<12} {:>8.2} {:>8.2}  {}",
            e.segment_id,
            e.start.as_secs_f64(),
            e.end.as_secs_f64(),
            e.tickers.join(",")
        );
    }
    Ok(())
}

/// Options for `pulse run`.
struct RunPlan {
    cache: Option<PathBuf>,
    fetch: bool,
    timing: Option<PathBuf>,
    outdir: PathBuf,
    backend: Backend,
    audio: bool,
    video: bool,
    ffmpeg: Option<String>,
}

/// Chart behind the thumbnail: the first scene's price chart, else the
/// top-movers table.
fn thumbnail_chart<'a>(
    story: &StoryPayload,
    timing: &TimingTemplate,
    charts: &'a ChartMeta,
) -> Option<&'a ChartEntry> {
    story
        .segments
        .iter()
        .enumerate()
        .filter(|(i, _)| timing.slot(*i).map(|s| s.layout) == Some(LayoutHint::Scene))
        .find_map(|(_, seg)| {
            seg.tickers
                .first()
                .and_then(|t| charts.for_ticker(t, ChartKind::Price))
        })
        .or_else(|| charts.get(ChartKind::TopMovers.as_str()))
}

fn run_pipeline(config: &PipelineConfig, plan: &RunPlan) -> Result<()> {
    let dir = &plan.outdir;
    info!(outdir = %dir.display(), "pipeline run started");

    if plan.fetch {
        let today = Utc::now().date_naive();
        if CsvCacheStore::new(&config.cache_dir).path_for(today).exists() {
            info!("today's prices already cached; skipping fetch");
        } else {
            run_fetch(config, Vec::new(), None, None, None, None, false)?;
        }
    }
    let (cache_path, _) = load_cache(config, plan.cache.as_deref())?;
    let cache = Some(cache_path.clone());

    let story_path = dir.join("story.json");
    let charts_dir = dir.join("charts");
    let signals_path = dir.join("signals/signals.json");
    let title_path = dir.join("signals/title.json");
    let audio_path = dir.join("audio/narration.wav");
    let subs_path = dir.join("subs/story.ass");

    run_story(config, cache.clone(), plan.timing.clone(), Vec::new(), None, &story_path, true)?;
    run_charts(config, cache.clone(), charts_dir.clone(), Vec::new(), false, 5)?;
    run_signals(config, cache.clone(), &signals_path)?;
    run_title(&signals_path, &title_path)?;

    let inputs = StoryInputs {
        story: story_path,
        timing: plan.timing.clone(),
        cache,
    };
    if plan.audio {
        run_audio(config, &inputs, plan.backend, &audio_path)?;
    }
    run_subtitles(config, &inputs, SubtitleFormat::Ass, &subs_path)?;

    let chart_meta = charts_dir.join(CHART_META_FILE);
    let stage = load_inputs(config, &inputs)?;
    let charts = ChartMeta::load(&chart_meta)
        .with_context(|| format!("failed to load chart meta {}", chart_meta.display()))?;
    let sheet = TitleSheet::load(&title_path)
        .with_context(|| format!("failed to load title sheet {}", title_path.display()))?;
    let (headline, subline) = match sheet.candidates.first() {
        Some(c) => (c.thumb.line1.clone(), Some(c.thumb.line2.clone())),
        None => (stage.story.title.clone(), None),
    };
    match thumbnail_chart(&stage.story, &stage.timing, &charts) {
        Some(chart) => {
            let output = dir.join("thumbnail.svg");
            render_thumbnail(&chart.path, &headline, subline.as_deref(), &output)
                .context("thumbnail failed")?;
            println!("Wrote {}", output.display());
        }
        None => warn!("no chart for the thumbnail; skipped"),
    }

    if plan.video {
        let video_path = dir.join("video.mp4");
        run_video(
            config,
            &inputs,
            &chart_meta,
            dir.join("frames"),
            video_path.clone(),
            plan.ffmpeg.clone(),
        )?;
        let burn = BurnConfig {
            video: video_path,
            subtitles: subs_path,
            audio: plan.audio.then_some(audio_path),
            output: dir.join("final.mp4"),
        };
        burn_in(&encoder(config, plan.ffmpeg.clone()), &burn).context("subtitle burn-in failed")?;
        println!("Wrote {}", burn.output.display());
    }

    println!("Run complete: {}", dir.display());
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let store = CsvCacheStore::new(cache_dir);
    let files = store.list()?;
    if files.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Files: {}", files.len());
    println!();
    println!("{:<24} {:<25} {:>6}  {}", "File", "Date Range", "Rows", "Tickers");
    println!("{}", "-".repeat(72));
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match CsvCacheStore::read_meta(path) {
            Some(meta) => println!(
                "{:<24} {:<25} {:>6}  {}",
                name,
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.row_count,
                meta.tickers.join(",")
            ),
            None => println!("{name:<24} (no meta)"),
        }
    }
    Ok(())
}
