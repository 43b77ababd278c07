//! Mobile thumbnail: a rendered chart stretched to 640x1280 under a dark
//! headline strip.

use crate::charts::svg::{self, Anchor, Svg};
use crate::video::frames::wrap_words;
use pulse_core::artifact::{self, ArtifactError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const THUMBNAIL_SIZE: (u32, u32) = (640, 1280);

const HEADLINE_WRAP: usize = 14;
const HEADLINE_SIZE: u32 = 72;
const HEADLINE_LEADING: f64 = 88.0;
const SUBLINE_SIZE: u32 = 40;
const STRIP_TOP: f64 = 20.0;
const MARGIN: f64 = 40.0;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("{path} is not an SVG document")]
    NotSvg { path: PathBuf },

    #[error("thumbnail headline is empty")]
    EmptyHeadline,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Size and inner markup of a standalone SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument<'a> {
    pub width: u32,
    pub height: u32,
    pub body: &'a str,
}

fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let key = format!(" {name}=\"");
    let start = tag.find(&key)? + key.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

fn pixels(value: &str) -> Option<u32> {
    let n: f64 = value.trim().trim_end_matches("px").parse().ok()?;
    (n.is_finite() && n >= 1.0).then(|| n.round() as u32)
}

/// Split a document into its root size and body. The size comes from the
/// root's width/height, else its viewBox.
pub fn parse_document(document: &str) -> Option<SvgDocument<'_>> {
    let open = document.find("<svg")?;
    let tag_end = open + document[open..].find('>')?;
    let tag = &document[open..tag_end];

    let from_view_box = || -> Option<(u32, u32)> {
        let view: Vec<&str> = attr(tag, "viewBox")?.split_whitespace().collect();
        Some((pixels(view.get(2)?)?, pixels(view.get(3)?)?))
    };
    let (width, height) = match (attr(tag, "width").and_then(pixels), attr(tag, "height").and_then(pixels)) {
        (Some(w), Some(h)) => (w, h),
        _ => from_view_box()?,
    };

    let body = if tag.ends_with('/') {
        ""
    } else {
        let close = document.rfind("</svg>")?;
        document.get(tag_end + 1..close)?
    };
    Some(SvgDocument {
        width,
        height,
        body,
    })
}

/// Compose the thumbnail from a chart document. `subline` is set smaller
/// under the headline.
pub fn compose(chart: &SvgDocument<'_>, headline: &str, subline: Option<&str>) -> Svg {
    let (w, h) = THUMBNAIL_SIZE;
    let mut thumb = Svg::new(w, h);
    thumb.nest((0.0, 0.0), (w as f64, h as f64), (chart.width, chart.height), chart.body);

    let lines = wrap_words(headline, HEADLINE_WRAP);
    let subline = subline.map(str::trim).filter(|s| !s.is_empty());
    let mut strip_h = MARGIN + lines.len() as f64 * HEADLINE_LEADING;
    if subline.is_some() {
        strip_h += SUBLINE_SIZE as f64 + 16.0;
    }
    thumb.shade(0.0, STRIP_TOP, w as f64, strip_h, "#000000", 0.7);

    let mut y = STRIP_TOP + MARGIN / 2.0 + HEADLINE_SIZE as f64;
    for line in &lines {
        thumb.text((MARGIN, y), HEADLINE_SIZE, svg::FOREGROUND, Anchor::Start, true, line);
        y += HEADLINE_LEADING;
    }
    if let Some(sub) = subline {
        thumb.text((MARGIN, y - 16.0), SUBLINE_SIZE, svg::ACCENT, Anchor::Start, false, sub);
    }
    thumb
}

/// Read `chart`, lay the headline over it, and write the thumbnail SVG.
pub fn render_thumbnail(
    chart: &Path,
    headline: &str,
    subline: Option<&str>,
    output: &Path,
) -> Result<(), ThumbnailError> {
    if headline.trim().is_empty() {
        return Err(ThumbnailError::EmptyHeadline);
    }
    let source = artifact::read_to_string(chart)?;
    let document = parse_document(&source).ok_or_else(|| ThumbnailError::NotSvg {
        path: chart.to_path_buf(),
    })?;

    let thumb = compose(&document, headline, subline);
    artifact::write_atomic(output, thumb.finish().as_bytes())?;
    info!(path = %output.display(), chart = %chart.display(), "thumbnail written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::render;

    fn chart_file(dir: &Path) -> PathBuf {
        let mut chart = Svg::new(render::TALL.0, render::TALL.1);
        chart.text((10.0, 40.0), 24, svg::FOREGROUND, Anchor::Start, true, "SPY 30d");
        let path = dir.join("SPY_price.svg");
        std::fs::write(&path, chart.finish()).unwrap();
        path
    }

    #[test]
    fn parses_root_size_and_body() {
        let doc = parse_document(
            r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="720" height="400"><rect/></svg>"#,
        )
        .unwrap();
        assert_eq!((doc.width, doc.height), (720, 400));
        assert_eq!(doc.body, "<rect/>");

        let doc = parse_document(r#"<svg viewBox="0 0 300 150"/>"#).unwrap();
        assert_eq!((doc.width, doc.height, doc.body), (300, 150, ""));
        assert!(parse_document("<html></html>").is_none());
    }

    #[test]
    fn headline_lands_over_the_chart() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart_file(dir.path());
        let output = dir.path().join("thumbs/thumbnail.svg");

        render_thumbnail(&chart, "SPY Breaks Out & Rallies", Some("SPY • 2 signals"), &output).unwrap();

        let thumb = std::fs::read_to_string(&output).unwrap();
        assert!(thumb.contains(r#"width="640" height="1280""#));
        assert!(thumb.contains(r#"viewBox="0 0 720 1280" preserveAspectRatio="none""#));
        assert!(thumb.contains("SPY 30d"));
        assert!(thumb.contains("SPY Breaks Out"));
        assert!(thumb.contains("&amp; Rallies"));
        assert!(thumb.contains("SPY • 2 signals"));
        assert!(thumb.find("SPY 30d") < thumb.find("SPY Breaks Out"));
    }

    #[test]
    fn blank_headline_and_non_svg_chart_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart_file(dir.path());
        let output = dir.path().join("thumbnail.svg");
        assert!(matches!(
            render_thumbnail(&chart, "  ", None, &output),
            Err(ThumbnailError::EmptyHeadline)
        ));

        let png = dir.path().join("chart.png");
        std::fs::write(&png, "not an image").unwrap();
        assert!(matches!(
            render_thumbnail(&png, "Headline", None, &output),
            Err(ThumbnailError::NotSvg { .. })
        ));
        assert!(matches!(
            render_thumbnail(&dir.path().join("nope.svg"), "Headline", None, &output),
            Err(ThumbnailError::Artifact(ArtifactError::Missing { .. }))
        ));
        assert!(!output.exists());
    }
}
