//! Reduces subtitles to a flat stream of words.
//!
//! Only the order of the spoken words matters for matching, so timing lines,
//! sequence numbers, markup and most punctuation are discarded and everything
//! left is joined into one line.

use once_cell::sync::Lazy;
use regex::Regex;

static TIMING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\d:.,]+\s*-->\s*[\d:.,]+").unwrap());

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\s*[^>]*>|\{[^}]*\}").unwrap());

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[^A-Za-z0-9_' ?.,!"\-]"#).unwrap());

static LEADING_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\-]+").unwrap());

static SEQUENCE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Normalizes SubRip or plain text. `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .filter(|line| !TIMING_LINE.is_match(line))
        .filter_map(clean_line)
        .collect();

    SPACES.replace_all(&lines.join(" "), " ").into_owned()
}

fn clean_line(line: &str) -> Option<String> {
    let without_markup = MARKUP.replace_all(line, " ");
    let allowed = DISALLOWED.replace_all(&without_markup, "");
    let unmarked = LEADING_MARKERS.replace(&allowed, "");
    let trimmed = unmarked.trim();

    if trimmed.is_empty() || SEQUENCE_INDEX.is_match(trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SRT: &str = "1\r\n\
00:00:01,000 --> 00:00:03,500\r\n\
<i>Where are you going?</i>\r\n\
\r\n\
2\r\n\
00:00:04,000 --> 00:00:06,000\r\n\
- To the store.\r\n\
- Again?\r\n\
\r\n\
3\r\n\
00:00:07,250 --> 00:00:09,000 X1:100 X2:600\r\n\
{\\an8}♪ Music plays ♪\r\n";

    #[test]
    fn test_normalize_srt() {
        assert_eq!(
            normalize(SAMPLE_SRT),
            "Where are you going? To the store. Again? Music plays"
        );
    }

    #[test]
    fn test_normalize_plain_text() {
        assert_eq!(
            normalize("Hello   there,\n\n  general Kenobi!\n"),
            "Hello there, general Kenobi!"
        );
    }

    #[test]
    fn test_normalize_strips_markup_and_symbols() {
        assert_eq!(
            normalize("<font color=\"#ffff00\">Yes</font> & no; [laughs]"),
            "Yes no laughs"
        );
    }

    #[test]
    fn test_normalize_keeps_numbers_inside_dialogue() {
        assert_eq!(normalize("12\nRoom 12, please.\n"), "Room 12, please.");
    }

    #[test]
    fn test_normalize_drops_dash_only_lines() {
        assert_eq!(normalize("- - -\n-- Right.\n"), "Right.");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("1\n00:00:01,000 --> 00:00:02,000\n\n"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            SAMPLE_SRT,
            "Hello   there,\n\n  general Kenobi!\n",
            "- - 42\n",
            "- 7\nline\n",
            "  --  a  -  b  ",
            "<b>bold</b>\t\ttabbed\n99\n",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample {sample:?}");
        }
    }
}
