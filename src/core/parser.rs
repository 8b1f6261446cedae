// Tycoon LogMon - core/parser.rs
//
// Line-oriented parsing of free-text Tycoon log lines into `LogEntry` values.
// Core layer: operates on strings, never touches the filesystem.
//
// A line may carry, in any position:
//   - a bracketed timestamp ([2025-07-13 21:45:32.123] or [21:45:32])
//   - a leading "[LEVEL] [SOURCE]" prefix
//   - marker glyphs (emoji / dingbats)
// None of these are required. Parsing never fails: whatever cannot be
// recognised is left blank and the entry is still produced.

use crate::core::classify::Classifier;
use crate::core::model::LogEntry;
use crate::util::logging;
use crate::util::constants;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::ops::{Range, RangeInclusive};
use std::sync::OnceLock;

/// Unicode blocks whose code points are collected as marker glyphs.
const GLYPH_RANGES: &[RangeInclusive<char>] = &[
    '\u{1F600}'..='\u{1F64F}', // emoticons
    '\u{1F300}'..='\u{1F5FF}', // symbols & pictographs
    '\u{1F680}'..='\u{1F6FF}', // transport & map
    '\u{1F1E0}'..='\u{1F1FF}', // regional indicators
    '\u{2600}'..='\u{27BF}',   // misc symbols & dingbats
];

/// A timestamp found in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    /// Timestamp text without the surrounding brackets.
    pub text: String,
    /// Byte range of the whole bracketed token within the line.
    pub span: Range<usize>,
    /// Resolved local wall-clock time, if the text is a valid time.
    pub resolved: Option<NaiveDateTime>,
}

/// Parses raw lines using a fixed timestamp table and a pluggable classifier.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    classifier: Classifier,
}

impl LineParser {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Parse one raw line into an entry.
    ///
    /// `now` is the reading time; time-only timestamps are dated from it.
    pub fn parse_line(
        &self,
        raw_line: &str,
        line_number: u64,
        source: &str,
        now: NaiveDateTime,
    ) -> LogEntry {
        let ts = extract_timestamp(raw_line, now);
        let level = self.classifier.classify(raw_line);
        let message = clean_message(raw_line, ts.as_ref().map(|t| t.span.clone()));

        let (timestamp, parsed_timestamp) = match ts {
            Some(t) => (t.text, t.resolved),
            None => (String::new(), None),
        };

        if !timestamp.is_empty() && parsed_timestamp.is_none() {
            tracing::debug!(
                source,
                line_number,
                timestamp = %timestamp,
                line = %logging::preview(raw_line),
                "Timestamp matched but could not be resolved"
            );
        }

        LogEntry {
            source: source.to_string(),
            line_number,
            raw_line: raw_line.to_string(),
            timestamp,
            parsed_timestamp,
            level,
            message,
            glyphs: extract_glyphs(raw_line),
        }
    }
}

// =============================================================================
// Timestamp extraction
// =============================================================================

/// Find the first recognised bracketed timestamp in `line`.
///
/// Patterns are tried from most to least specific and the first pattern with
/// a structural match anywhere in the line wins. The order decides ambiguous
/// lines, not the semantics: a line holding both `[21:45:32]` and
/// `[2025-07-13 21:45:32]` yields the dated one because its pattern is tried
/// first, wherever it appears.
///
/// A structural match whose text is not a valid time (e.g. `[25:61:00]`) is
/// still returned, with `resolved: None`.
pub fn extract_timestamp(line: &str, now: NaiveDateTime) -> Option<TimestampMatch> {
    struct TimestampPattern {
        re: Regex,
        resolve: fn(&str, NaiveDateTime) -> Option<NaiveDateTime>,
    }

    static PATTERNS: OnceLock<Vec<TimestampPattern>> = OnceLock::new();

    let patterns = PATTERNS.get_or_init(|| {
        // Patterns are fixed and covered by the tests below.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("extract_timestamp: invalid regex")
        }

        vec![
            // [2025-07-13 21:45:32.123]
            TimestampPattern {
                re: re(r"\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+)\]"),
                resolve: |s, _| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok(),
            },
            // [2025-07-13 21:45:32]
            TimestampPattern {
                re: re(r"\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]"),
                resolve: |s, _| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok(),
            },
            // [21:45:32.123], most recent occurrence
            TimestampPattern {
                re: re(r"\[(\d{2}:\d{2}:\d{2}\.\d+)\]"),
                resolve: |s, now| {
                    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                        .ok()
                        .map(|t| date_time_only(t, now))
                },
            },
            // [21:45:32], most recent occurrence
            TimestampPattern {
                re: re(r"\[(\d{2}:\d{2}:\d{2})\]"),
                resolve: |s, now| {
                    NaiveTime::parse_from_str(s, "%H:%M:%S")
                        .ok()
                        .map(|t| date_time_only(t, now))
                },
            },
        ]
    });

    patterns.iter().find_map(|p| {
        let caps = p.re.captures(line)?;
        let whole = caps.get(0)?;
        let inner = caps.get(1)?.as_str();
        Some(TimestampMatch {
            text: inner.to_string(),
            span: whole.range(),
            resolved: (p.resolve)(inner, now),
        })
    })
}

/// Date a time-only stamp: today, unless that lands well after `now`, in
/// which case the line was written before midnight.
fn date_time_only(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today - now > Duration::minutes(constants::TIME_ONLY_FUTURE_SLACK_MINUTES) {
        today - Duration::days(1)
    } else {
        today
    }
}

// =============================================================================
// Glyphs and message cleanup
// =============================================================================

/// Collect marker glyphs in order of appearance, duplicates kept.
pub fn extract_glyphs(line: &str) -> Vec<char> {
    line.chars()
        .filter(|c| GLYPH_RANGES.iter().any(|r| r.contains(c)))
        .collect()
}

/// Remove the timestamp token and a leading `[LEVEL] [SOURCE]` prefix, then
/// trim. May return an empty string.
pub fn clean_message(line: &str, timestamp_span: Option<Range<usize>>) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"(?i)^\[(?:INFO|ERROR|WARN|WARNING|SUCCESS|DEBUG)\]\s*(?:\[[^\[\]\s]+\]\s*)?")
            .expect("clean_message: invalid regex")
    });

    let without_ts = match timestamp_span {
        Some(span) => format!("{}{}", &line[..span.start], &line[span.end..]),
        None => line.to_string(),
    };
    let trimmed = without_ts.trim();
    prefix.replace(trimmed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Level;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 13).unwrap()
    }

    fn now() -> NaiveDateTime {
        today().and_hms_opt(22, 0, 0).unwrap()
    }

    fn parse(line: &str) -> LogEntry {
        LineParser::default().parse_line(line, 7, "tycoon", now())
    }

    #[test]
    fn test_completed_panel_line() {
        let e = parse("[2025-07-13 21:45:32.123] \u{2705} Completed panel 01-1001");
        assert_eq!(e.level, Level::Success);
        assert!(e.contains_success());
        assert!(!e.contains_error());
        assert_eq!(e.timestamp, "2025-07-13 21:45:32.123");
        let expected = NaiveDateTime::parse_from_str("2025-07-13 21:45:32.123", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap();
        assert_eq!(e.parsed_timestamp, Some(expected));
        assert_eq!(e.message, "\u{2705} Completed panel 01-1001");
        assert_eq!(e.glyphs, vec!['\u{2705}']);
        assert_eq!(e.line_number, 7);
        assert_eq!(e.source, "tycoon");
    }

    #[test]
    fn test_level_prefix_without_timestamp() {
        let e = parse("[ERROR] Failed to set parameter");
        assert_eq!(e.level, Level::Error);
        assert!(e.contains_error());
        assert_eq!(e.timestamp, "");
        assert!(e.parsed_timestamp.is_none());
        assert_eq!(e.message, "Failed to set parameter");
        assert_eq!(e.raw_line, "[ERROR] Failed to set parameter");
    }

    #[test]
    fn test_date_time_without_fraction() {
        let ts = extract_timestamp("x [2025-07-13 21:45:32] y", now()).unwrap();
        assert_eq!(ts.text, "2025-07-13 21:45:32");
        assert_eq!(ts.span, 2..23);
        assert_eq!(
            ts.resolved,
            today().and_hms_opt(21, 45, 32)
        );
    }

    #[test]
    fn test_time_only_uses_supplied_date() {
        let ts = extract_timestamp("[08:01:02] start", now()).unwrap();
        assert_eq!(ts.text, "08:01:02");
        assert_eq!(ts.resolved, today().and_hms_opt(8, 1, 2));

        let ts = extract_timestamp("[08:01:02.250] start", now()).unwrap();
        assert_eq!(ts.text, "08:01:02.250");
        assert_eq!(ts.resolved, today().and_hms_milli_opt(8, 1, 2, 250));
    }

    #[test]
    fn test_time_only_before_midnight_dates_to_yesterday() {
        let just_after_midnight = NaiveDate::from_ymd_opt(2025, 7, 14)
            .unwrap()
            .and_hms_opt(0, 5, 0)
            .unwrap();
        let ts = extract_timestamp("[23:58:00] [ERROR] Failed", just_after_midnight).unwrap();
        assert_eq!(ts.resolved, today().and_hms_opt(23, 58, 0));

        let ts = extract_timestamp("[00:04:30.500] ok", just_after_midnight).unwrap();
        assert_eq!(
            ts.resolved,
            NaiveDate::from_ymd_opt(2025, 7, 14)
                .unwrap()
                .and_hms_milli_opt(0, 4, 30, 500)
        );
    }

    #[test]
    fn test_time_only_slightly_ahead_stays_today() {
        // Writer clock a little ahead of ours.
        let ts = extract_timestamp("[22:00:30] ahead", now()).unwrap();
        assert_eq!(ts.resolved, today().and_hms_opt(22, 0, 30));
    }

    #[test]
    fn test_invalid_time_kept_as_text() {
        let e = parse("[25:61:00] clock went wrong");
        assert_eq!(e.timestamp, "25:61:00");
        assert!(e.parsed_timestamp.is_none());
        assert_eq!(e.message, "clock went wrong");
    }

    #[test]
    fn test_pattern_order_beats_position() {
        let ts = extract_timestamp("[09:00:00] replay of [2025-07-12 08:00:00]", now()).unwrap();
        assert_eq!(ts.text, "2025-07-12 08:00:00");
        // The time-only token stays in the cleaned message.
        let e = parse("[09:00:00] replay of [2025-07-12 08:00:00]");
        assert_eq!(e.message, "[09:00:00] replay of");
    }

    #[test]
    fn test_unbracketed_timestamp_not_extracted() {
        assert!(extract_timestamp("2025-07-13 21:45:32 plain", now()).is_none());
    }

    #[test]
    fn test_timestamp_anywhere_in_line() {
        let e = parse("[INFO] [Tycoon] [21:45:32] \u{1F50D} scanning walls");
        assert_eq!(e.timestamp, "21:45:32");
        assert_eq!(e.message, "\u{1F50D} scanning walls");
        assert_eq!(e.level, Level::Info);
    }

    #[test]
    fn test_prefix_cleanup_case_insensitive() {
        assert_eq!(clean_message("[warn] [tycoon] slow regen", None), "slow regen");
        assert_eq!(clean_message("[Info]   hello", None), "hello");
    }

    #[test]
    fn test_prefix_only_stripped_at_start() {
        assert_eq!(
            clean_message("panel [ERROR] [Tycoon] text", None),
            "panel [ERROR] [Tycoon] text"
        );
    }

    #[test]
    fn test_source_tag_with_spaces_is_kept() {
        assert_eq!(
            clean_message("[ERROR] [Element 123] missing host", None),
            "[Element 123] missing host"
        );
    }

    #[test]
    fn test_message_may_be_empty() {
        let e = parse("[2025-07-13 21:45:32]");
        assert_eq!(e.message, "");
        assert_eq!(e.timestamp, "2025-07-13 21:45:32");
    }

    #[test]
    fn test_glyphs_in_order_with_duplicates() {
        let glyphs = extract_glyphs("\u{1F525} a \u{2705} b \u{1F525} c \u{1F1FA}");
        assert_eq!(glyphs, vec!['\u{1F525}', '\u{2705}', '\u{1F525}', '\u{1F1FA}']);
    }

    #[test]
    fn test_glyphs_ignore_ordinary_text() {
        assert!(extract_glyphs("plain ascii and accents: caf\u{e9}").is_empty());
    }

    #[test]
    fn test_warning_sign_variation_selector_not_collected() {
        // U+FE0F sits outside the glyph ranges; only the sign itself counts.
        assert_eq!(extract_glyphs("\u{26A0}\u{FE0F} careful"), vec!['\u{26A0}']);
    }

    #[test]
    fn test_classification_uses_raw_line_not_message() {
        // The prefix is stripped from the message but still drives the level.
        let e = parse("[WARN] [Tycoon] disk nearly full");
        assert_eq!(e.level, Level::Warning);
        assert_eq!(e.message, "disk nearly full");
    }
}
