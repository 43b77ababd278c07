//! Minimal SVG document builder.

use std::fmt::Write;

pub const BACKGROUND: &str = "#0f1116";
pub const FOREGROUND: &str = "#f5f5f5";
pub const MUTED: &str = "#8a8f98";
pub const GRID: &str = "#2a2e36";
pub const UP: &str = "#26a69a";
pub const DOWN: &str = "#ef5350";
pub const ACCENT: &str = "#ff7f0e";
pub const VOLUME: &str = "#4c72b0";
pub const FONT: &str = "DejaVu Sans, Arial, sans-serif";

/// Escape text for use in SVG/HTML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Linear map from a data range onto a pixel range. A flat data range maps
/// to the middle of the pixel range.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    pub fn new(lo: f64, hi: f64, px_lo: f64, px_hi: f64) -> Self {
        Self { lo, hi, px_lo, px_hi }
    }

    /// Fit the finite values with a fractional margin on both ends.
    pub fn fit(values: impl IntoIterator<Item = f64>, margin: f64, px_lo: f64, px_hi: f64) -> Self {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in values.into_iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if !lo.is_finite() {
            return Self::new(0.0, 1.0, px_lo, px_hi);
        }
        let pad = (hi - lo) * margin;
        Self::new(lo - pad, hi + pad, px_lo, px_hi)
    }

    pub fn map(&self, v: f64) -> f64 {
        let span = self.hi - self.lo;
        if span.abs() < f64::EPSILON {
            return (self.px_lo + self.px_hi) / 2.0;
        }
        self.px_lo + (v - self.lo) / span * (self.px_hi - self.px_lo)
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }
}

pub struct Svg {
    width: u32,
    height: u32,
    body: String,
}

impl Svg {
    pub fn new(width: u32, height: u32) -> Self {
        let mut svg = Self {
            width,
            height,
            body: String::new(),
        };
        svg.rect(0.0, 0.0, width as f64, height as f64, BACKGROUND);
        svg
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) -> &mut Self {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{fill}"/>"#,
            w.max(0.0),
            h.max(0.0)
        );
        self
    }

    /// Rectangle with partial opacity, for strips laid over other content.
    pub fn shade(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, opacity: f64) -> &mut Self {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{fill}" fill-opacity="{:.2}"/>"#,
            w.max(0.0),
            h.max(0.0),
            opacity.clamp(0.0, 1.0)
        );
        self
    }

    /// Place another document's body in the `w` x `h` box at (x, y),
    /// stretched from its own `view` size.
    pub fn nest(
        &mut self,
        (x, y): (f64, f64),
        (w, h): (f64, f64),
        (view_w, view_h): (u32, u32),
        body: &str,
    ) -> &mut Self {
        let _ = writeln!(
            self.body,
            r#"<svg x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" viewBox="0 0 {view_w} {view_h}" preserveAspectRatio="none">"#
        );
        self.body.push_str(body.trim());
        self.body.push_str("\n</svg>\n");
        self
    }

    pub fn line(
        &mut self,
        (x1, y1): (f64, f64),
        (x2, y2): (f64, f64),
        stroke: &str,
        width: f64,
        dashed: bool,
    ) -> &mut Self {
        let dash = if dashed { r#" stroke-dasharray="6 4""# } else { "" };
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{stroke}" stroke-width="{width}"{dash}/>"#
        );
        self
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) -> &mut Self {
        if points.len() < 2 {
            return self;
        }
        let pts: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{stroke}" stroke-width="{width}" stroke-linejoin="round"/>"#,
            pts.join(" ")
        );
        self
    }

    pub fn circle(&mut self, (cx, cy): (f64, f64), r: f64, fill: &str) -> &mut Self {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r}" fill="{fill}"/>"#
        );
        self
    }

    pub fn text(
        &mut self,
        (x, y): (f64, f64),
        size: u32,
        fill: &str,
        anchor: Anchor,
        bold: bool,
        content: &str,
    ) -> &mut Self {
        let weight = if bold { "bold" } else { "normal" };
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-family="{FONT}" font-size="{size}" font-weight="{weight}" fill="{fill}" text-anchor="{}">{}</text>"#,
            anchor.as_str(),
            escape(content)
        );
        self
    }

    pub fn finish(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
{body}</svg>
"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}
