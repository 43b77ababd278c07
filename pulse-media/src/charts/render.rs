//! Chart drawings for one ticker, plus the top-movers table.

use super::svg::{self, Anchor, Scale, Svg};
use pulse_core::domain::{PriceRow, PriceSeries};
use pulse_core::signals::rolling_mean;

pub const TALL: (u32, u32) = (720, 1280);
pub const WIDE: (u32, u32) = (720, 400);

const MA_WINDOW: usize = 20;

/// Plot box inside a canvas: left, top, right, bottom.
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Frame {
    fn inset(width: u32, height: u32, top: f64, bottom: f64) -> Self {
        Self {
            left: 70.0,
            top,
            right: width as f64 - 30.0,
            bottom: height as f64 - bottom,
        }
    }

    fn x_scale(&self, n: usize) -> Scale {
        Scale::new(0.0, (n.max(2) - 1) as f64, self.left, self.right)
    }

    fn gridlines(&self, svg: &mut Svg, y: &Scale, ticks: usize, fmt: impl Fn(f64) -> String) {
        for i in 0..=ticks {
            let v = y.lo() + (y.hi() - y.lo()) * i as f64 / ticks as f64;
            let py = y.map(v);
            svg.line((self.left, py), (self.right, py), svg::GRID, 1.0, false);
            svg.text((self.left - 8.0, py + 5.0), 14, svg::MUTED, Anchor::End, false, &fmt(v));
        }
    }
}

fn valid_rows(series: &PriceSeries) -> Vec<&PriceRow> {
    series.rows.iter().filter(|r| !r.is_void()).collect()
}

fn date_labels(svg: &mut Svg, frame: &Frame, x: &Scale, rows: &[&PriceRow]) {
    let Some(last) = rows.len().checked_sub(1) else {
        return;
    };
    for i in [0, last / 2, last] {
        svg.text(
            (x.map(i as f64), frame.bottom + 24.0),
            14,
            svg::MUTED,
            Anchor::Middle,
            false,
            &rows[i].date.format("%b %d").to_string(),
        );
    }
}

/// Tall close-price line with its 20-bar moving average and a headline box.
pub fn price_chart(series: &PriceSeries) -> Svg {
    let (w, h) = TALL;
    let mut svg = Svg::new(w, h);
    let rows = valid_rows(series);
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let ma = rolling_mean(&closes, MA_WINDOW);

    let headline = match closes.as_slice() {
        [.., prev, last] if *prev != 0.0 => {
            format!("{} {last:.2} ({:+.2}%)", series.ticker, (last / prev - 1.0) * 100.0)
        }
        [.., last] => format!("{} {last:.2}", series.ticker),
        [] => series.ticker.clone(),
    };
    svg.rect(40.0, 40.0, w as f64 - 80.0, 80.0, "#000000");
    svg.text((w as f64 / 2.0, 95.0), 40, svg::FOREGROUND, Anchor::Middle, true, &headline);

    if let Some(peak) = rows.iter().filter(|r| r.volume.is_some()).max_by_key(|r| r.volume) {
        let label = format!(
            "Highest vol: {} ({})",
            peak.date.format("%Y-%m-%d"),
            thousands(peak.volume.unwrap_or(0))
        );
        svg.text((w as f64 / 2.0, 150.0), 20, svg::MUTED, Anchor::Middle, false, &label);
    }

    let frame = Frame::inset(w, h, 200.0, 80.0);
    let x = frame.x_scale(closes.len());
    let y = Scale::fit(closes.iter().chain(&ma).copied(), 0.05, frame.bottom, frame.top);
    frame.gridlines(&mut svg, &y, 6, |v| format!("{v:.2}"));

    let up = closes.last() >= closes.first();
    let line: Vec<(f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| (x.map(i as f64), y.map(c)))
        .collect();
    let ma_line: Vec<(f64, f64)> = ma
        .iter()
        .enumerate()
        .map(|(i, &m)| (x.map(i as f64), y.map(m)))
        .collect();
    svg.polyline(&ma_line, svg::ACCENT, 2.0);
    svg.polyline(&line, if up { svg::UP } else { svg::DOWN }, 4.0);
    if let Some(&last) = line.last() {
        svg.circle(last, 7.0, svg::FOREGROUND);
    }
    svg.text((frame.right, frame.top - 12.0), 16, svg::ACCENT, Anchor::End, false, "MA20");
    date_labels(&mut svg, &frame, &x, &rows);
    svg
}

/// Day-over-day percent change for the last `days` bars.
pub fn pct_change_chart(series: &PriceSeries, days: usize) -> Svg {
    let (w, h) = WIDE;
    let mut svg = Svg::new(w, h);
    let rows = valid_rows(series);
    let rows = &rows[rows.len().saturating_sub(days)..];

    let pct: Vec<f64> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| match i.checked_sub(1).map(|p| rows[p].close) {
            Some(prev) if prev != 0.0 => (r.close / prev - 1.0) * 100.0,
            _ => 0.0,
        })
        .collect();

    svg.text(
        (w as f64 / 2.0, 34.0),
        22,
        svg::FOREGROUND,
        Anchor::Middle,
        true,
        &format!("{} % change (last {days} days)", series.ticker),
    );
    let frame = Frame::inset(w, h, 60.0, 50.0);
    let x = frame.x_scale(pct.len());
    let y = Scale::fit(pct.iter().copied().chain([0.0]), 0.15, frame.bottom, frame.top);
    frame.gridlines(&mut svg, &y, 4, |v| format!("{v:+.1}%"));
    svg.line((frame.left, y.map(0.0)), (frame.right, y.map(0.0)), svg::MUTED, 1.5, true);

    let points: Vec<(f64, f64)> = pct
        .iter()
        .enumerate()
        .map(|(i, &p)| (x.map(i as f64), y.map(p)))
        .collect();
    svg.polyline(&points, svg::ACCENT, 3.0);
    for &p in &points {
        svg.circle(p, 5.0, svg::ACCENT);
    }
    date_labels(&mut svg, &frame, &x, rows);
    svg
}

/// Volume bars for the last `days` bars with their average as a dashed line.
pub fn volume_chart(series: &PriceSeries, days: usize) -> Svg {
    let (w, h) = WIDE;
    let mut svg = Svg::new(w, h);
    let rows = valid_rows(series);
    let rows = &rows[rows.len().saturating_sub(days)..];
    let volumes: Vec<f64> = rows.iter().map(|r| r.volume.unwrap_or(0) as f64).collect();
    let avg = if volumes.is_empty() {
        0.0
    } else {
        volumes.iter().sum::<f64>() / volumes.len() as f64
    };

    svg.text(
        (w as f64 / 2.0, 34.0),
        22,
        svg::FOREGROUND,
        Anchor::Middle,
        true,
        &format!("{} Volume (last {days} days)", series.ticker),
    );
    let frame = Frame::inset(w, h, 60.0, 50.0);
    let peak = volumes.iter().copied().fold(0.0, f64::max);
    let y = Scale::new(0.0, peak.max(1.0) * 1.1, frame.bottom, frame.top);
    frame.gridlines(&mut svg, &y, 4, compact);

    let slot = (frame.right - frame.left) / volumes.len().max(1) as f64;
    for (i, &v) in volumes.iter().enumerate() {
        let top = y.map(v);
        let fill = if v > 2.0 * avg && avg > 0.0 { svg::DOWN } else { svg::VOLUME };
        svg.rect(
            frame.left + i as f64 * slot + slot * 0.15,
            top,
            slot * 0.7,
            frame.bottom - top,
            fill,
        );
    }
    svg.line((frame.left, y.map(avg)), (frame.right, y.map(avg)), svg::MUTED, 1.5, true);
    svg
}

/// One row of the top-movers table.
#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub ticker: String,
    pub close: f64,
    pub pct_change: f64,
    pub avg_volume: u64,
}

impl Mover {
    /// Last close vs the one before, with the 30-bar average volume.
    pub fn from_series(series: &PriceSeries) -> Option<Self> {
        let rows = valid_rows(series);
        let [.., prev, last] = rows.as_slice() else {
            return None;
        };
        let tail = &rows[rows.len().saturating_sub(30)..];
        let avg_volume =
            tail.iter().map(|r| r.volume.unwrap_or(0)).sum::<u64>() / tail.len() as u64;
        Some(Self {
            ticker: series.ticker.clone(),
            close: last.close,
            pct_change: if prev.close != 0.0 {
                (last.close / prev.close - 1.0) * 100.0
            } else {
                0.0
            },
            avg_volume,
        })
    }
}

/// The `top_n` largest absolute movers, largest first; ties by ticker.
pub fn rank_movers<'a>(series: impl IntoIterator<Item = &'a PriceSeries>, top_n: usize) -> Vec<Mover> {
    let mut movers: Vec<Mover> = series.into_iter().filter_map(Mover::from_series).collect();
    movers.sort_by(|a, b| {
        b.pct_change
            .abs()
            .total_cmp(&a.pct_change.abs())
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    movers.truncate(top_n);
    movers
}

pub fn top_movers_table(movers: &[Mover]) -> Svg {
    let (w, h) = WIDE;
    let mut svg = Svg::new(w, h);
    let columns = [(90.0, "Symbol"), (270.0, "Close"), (430.0, "%"), (610.0, "AvgVol")];
    svg.text((w as f64 / 2.0, 40.0), 24, svg::FOREGROUND, Anchor::Middle, true, "Top Movers");
    for (x, label) in columns {
        svg.text((x, 90.0), 18, svg::MUTED, Anchor::Middle, true, label);
    }
    svg.line((30.0, 104.0), (w as f64 - 30.0, 104.0), svg::GRID, 1.5, false);

    for (i, m) in movers.iter().enumerate() {
        let y = 140.0 + i as f64 * 48.0;
        let color = if m.pct_change >= 0.0 { svg::UP } else { svg::DOWN };
        svg.text((columns[0].0, y), 20, svg::FOREGROUND, Anchor::Middle, true, &m.ticker);
        svg.text((columns[1].0, y), 20, svg::FOREGROUND, Anchor::Middle, false, &format!("{:.2}", m.close));
        svg.text((columns[2].0, y), 20, color, Anchor::Middle, true, &format!("{:+.2}%", m.pct_change));
        svg.text((columns[3].0, y), 20, svg::FOREGROUND, Anchor::Middle, false, &thousands(m.avg_volume));
    }
    svg
}

/// `12345678` -> `12,345,678`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Axis label: `1.2M`, `340K`.
fn compact(v: f64) -> String {
    match v {
        v if v >= 1e9 => format!("{:.1}B", v / 1e9),
        v if v >= 1e6 => format!("{:.1}M", v / 1e6),
        v if v >= 1e3 => format!("{:.0}K", v / 1e3),
        v => format!("{v:.0}"),
    }
}
