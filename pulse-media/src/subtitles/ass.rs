//! Advanced SubStation Alpha output.

use pulse_core::Timeline;
use std::fmt::Write;
use std::time::Duration;

/// Lines longer than this (in characters) get one soft break.
pub const WRAP_AT: usize = 40;

const FADE: &str = r"{\fad(150,150)}";

const HEADER: &str = "[Script Info]
Title: Market Pulse subtitles
ScriptType: v4.00+
PlayResX: 720
PlayResY: 1280
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,DejaVu Sans,44,&H00FFFFFF,&H0000FFFF,&H00000000,&H64000000,1,0,0,0,100,100,0,0,1,2,1,2,30,30,80,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// `H:MM:SS.cc`
pub fn timestamp(t: Duration) -> String {
    let cs = (t.as_secs_f64() * 100.0).round() as u64;
    let (h, rem) = (cs / 360_000, cs % 360_000);
    let (m, rem) = (rem / 6_000, rem % 6_000);
    let (s, cs) = (rem / 100, rem % 100);
    format!("{h}:{m:02}:{s:02}.{cs:02}")
}

/// Break a long line once: at the comma nearest the middle, else before an
/// em-dash, else at the last space before the middle.
pub fn wrap(text: &str) -> String {
    if text.chars().count() <= WRAP_AT {
        return text.to_string();
    }
    let mut mid = text.len() / 2;
    while !text.is_char_boundary(mid) {
        mid -= 1;
    }

    let comma = text
        .match_indices(',')
        .map(|(i, _)| i)
        .filter(|&i| i + 1 < text.len())
        .min_by_key(|&i| i.abs_diff(mid));
    if let Some(i) = comma {
        return format!("{}\\N{}", text[..=i].trim_end(), text[i + 1..].trim_start());
    }

    if let Some(i) = text.find(" — ") {
        return format!("{}\\N{}", text[..i].trim_end(), text[i + 1..].trim_start());
    }

    let space = text[..mid]
        .rfind(' ')
        .or_else(|| text[mid..].find(' ').map(|i| i + mid));
    match space {
        Some(i) => format!("{}\\N{}", text[..i].trim_end(), text[i + 1..].trim_start()),
        None => text.to_string(),
    }
}

/// ASS override blocks start with `{`; keep narration text literal.
fn sanitize(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('{', "(").replace('}', ")")
}

pub fn render(timeline: &Timeline) -> String {
    let mut out = String::from(HEADER);
    for entry in &timeline.entries {
        let text = entry.text.trim();
        if text.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{FADE}{}",
            timestamp(entry.start),
            timestamp(entry.end),
            wrap(&sanitize(text))
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Segment, StoryPayload, TimingTemplate};

    #[test]
    fn timestamps_are_centiseconds() {
        assert_eq!(timestamp(Duration::ZERO), "0:00:00.00");
        assert_eq!(timestamp(Duration::from_millis(2_500)), "0:00:02.50");
        assert_eq!(timestamp(Duration::from_millis(3_725_456)), "1:02:05.46");
    }

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(wrap("SPY up 1.2% today."), "SPY up 1.2% today.");
    }

    #[test]
    fn wraps_at_comma_nearest_middle() {
        let line = "Gold rallied two percent, while bonds slipped lower again";
        assert_eq!(
            wrap(line),
            "Gold rallied two percent,\\Nwhile bonds slipped lower again"
        );
    }

    #[test]
    fn wraps_before_em_dash() {
        let line = "Crude is the story of the week — up eight percent";
        assert_eq!(wrap(line), "Crude is the story of the week\\N— up eight percent");
    }

    #[test]
    fn wraps_at_space_before_middle() {
        let line = "The dollar index drifted sideways for the fifth day";
        let wrapped = wrap(line);
        let (a, b) = wrapped.split_once("\\N").unwrap();
        assert_eq!(format!("{a} {b}"), line);
        assert!(a.len() <= line.len() / 2);
    }

    #[test]
    fn dialogue_lines_skip_silent_segments() {
        let story = StoryPayload::new(vec![
            Segment::new("intro", "Market pulse."),
            Segment::new("gap", "  "),
            Segment::new("outro", "See you {tomorrow}."),
        ]);
        let timing = TimingTemplate::standard(2.5, 5.0, 1, 2.5);
        let doc = render(&Timeline::build(&story, &timing));

        assert!(doc.starts_with("[Script Info]\nTitle: Market Pulse subtitles\nScriptType: v4.00+"));
        let dialogue: Vec<&str> = doc.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(
            dialogue,
            [
                r"Dialogue: 0,0:00:00.00,0:00:02.50,Default,,0,0,0,,{\fad(150,150)}Market pulse.",
                r"Dialogue: 0,0:00:07.50,0:00:10.00,Default,,0,0,0,,{\fad(150,150)}See you (tomorrow).",
            ]
        );
    }
}
