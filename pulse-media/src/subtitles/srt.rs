//! SubRip output.

use pulse_core::Timeline;
use std::fmt::Write;
use std::time::Duration;

/// `HH:MM:SS,mmm`
pub fn timestamp(t: Duration) -> String {
    let ms = (t.as_nanos() + 500_000) / 1_000_000;
    let (h, rem) = (ms / 3_600_000, ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, ms) = (rem / 1_000, rem % 1_000);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// A blank line ends an SRT cue, so cue text is folded onto one line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn render(timeline: &Timeline) -> String {
    let mut out = String::new();
    let cues = timeline
        .entries
        .iter()
        .filter(|e| !e.text.trim().is_empty());
    for (n, entry) in cues.enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            n + 1,
            timestamp(entry.start),
            timestamp(entry.end),
            one_line(&entry.text)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Segment, StoryPayload, TimingTemplate};

    #[test]
    fn timestamps_are_milliseconds() {
        assert_eq!(timestamp(Duration::ZERO), "00:00:00,000");
        assert_eq!(timestamp(Duration::from_millis(62_005)), "00:01:02,005");
        assert_eq!(timestamp(Duration::from_secs(3_600)), "01:00:00,000");
    }

    #[test]
    fn cues_are_numbered_from_one() {
        let story = StoryPayload::new(vec![
            Segment::new("intro", ""),
            Segment::new("s1", "SPY closed higher."),
            Segment::new("outro", "That's the pulse."),
        ]);
        let timing = TimingTemplate::standard(2.5, 5.0, 1, 2.5);
        let srt = render(&Timeline::build(&story, &timing));
        assert_eq!(
            srt,
            "1\n00:00:02,500 --> 00:00:07,500\nSPY closed higher.\n\n\
             2\n00:00:07,500 --> 00:00:10,000\nThat's the pulse.\n\n"
        );
    }

    #[test]
    fn embedded_blank_lines_stay_inside_one_cue() {
        let story = StoryPayload::new(vec![
            Segment::new("intro", "a\n\nb"),
            Segment::new("s1", "SPY\r\nup."),
            Segment::new("outro", "end"),
        ]);
        let timing = TimingTemplate::standard(2.5, 5.0, 1, 2.5);
        let srt = render(&Timeline::build(&story, &timing));
        let cues: Vec<&str> = srt.trim_end().split("\n\n").collect();
        assert_eq!(cues.len(), 3);
        assert!(cues[0].ends_with("\na b"));
        assert!(cues[1].ends_with("\nSPY up."));
    }
}
