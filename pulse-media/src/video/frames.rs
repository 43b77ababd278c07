//! Still frames and the ffmpeg concat list.

use crate::charts::svg::{self, Anchor, Svg};
use crate::video::encoder::FRAME_SIZE;
use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

const CARD_WRAP: usize = 22;

/// Greedy word wrap to at most `width` characters per line. Words longer than
/// `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Full-frame card with a bold heading and an optional body paragraph.
pub fn title_card(heading: &str, body: &str) -> Svg {
    let (w, h) = FRAME_SIZE;
    let cx = w as f64 / 2.0;
    let mut card = Svg::new(w, h);
    card.rect(0.0, h as f64 * 0.30, w as f64, 6.0, svg::ACCENT);

    let heading = wrap_words(heading, CARD_WRAP);
    let body = wrap_words(body, CARD_WRAP + 6);
    let mut y = h as f64 * 0.30 + 110.0;
    for line in &heading {
        card.text((cx, y), 60, svg::FOREGROUND, Anchor::Middle, true, line);
        y += 76.0;
    }
    y += 40.0;
    for line in &body {
        card.text((cx, y), 38, svg::MUTED, Anchor::Middle, false, line);
        y += 52.0;
    }
    card
}

fn quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Concat demuxer input: each frame held for its duration. The last file is
/// listed again so its duration is honored.
pub fn concat_list(frames: &[(&Path, Duration)]) -> String {
    let mut out = String::from("ffconcat version 1.0\n");
    for (path, duration) in frames {
        let _ = writeln!(out, "file {}", quote(path));
        let _ = writeln!(out, "duration {:.3}", duration.as_secs_f64());
    }
    if let Some((last, _)) = frames.last() {
        let _ = writeln!(out, "file {}", quote(last));
    }
    out
}
