// Tycoon LogMon - core/aggregate.rs
//
// Per-source parse + filter, then cross-source merge.
// Core layer: the app layer reads the files and hands the tail lines in.
//
// Tail limiting happens twice: per source before parsing (in the reader, so
// huge files are never fully parsed) and once more on the merged, filtered
// result here. A busy source can therefore crowd quieter ones out of the
// final list; that is accepted.

use crate::core::filter::{self, EntryFilter};
use crate::core::model::LogEntry;
use crate::core::parser::LineParser;

/// Merged output of all sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
    /// Entries in merge order, at most `tail_lines` of them.
    pub entries: Vec<LogEntry>,

    /// Sources with at least one entry in `entries`, in order of first
    /// appearance.
    pub contributing_sources: Vec<String>,
}

/// Parse one source's tail lines and apply the filter.
///
/// `lines` are `(line_number, text)` pairs in file order. Blank lines carry
/// no information and produce no entry; every other line produces exactly
/// one entry before filtering, whether or not anything in it was recognised.
pub fn parse_source<I, S>(
    source: &str,
    lines: I,
    parser: &LineParser,
    filter: &EntryFilter,
) -> Vec<LogEntry>
where
    I: IntoIterator<Item = (u64, S)>,
    S: AsRef<str>,
{
    let parsed: Vec<LogEntry> = lines
        .into_iter()
        .filter_map(|(line_number, text)| {
            let line = text.as_ref().trim();
            (!line.is_empty()).then(|| parser.parse_line(line, line_number, source, filter.now))
        })
        .collect();
    let parsed_count = parsed.len();

    let entries = filter::apply_filter(parsed, filter);

    tracing::debug!(
        source,
        parsed = parsed_count,
        kept = entries.len(),
        "Source parsed"
    );

    entries
}

/// Concatenate per-source entry lists, sort by the best-available timestamp
/// and keep the last `tail_lines`.
///
/// The sort is stable: entries with equal keys keep file order within a
/// source and the caller's source order across sources.
pub fn merge(per_source: Vec<Vec<LogEntry>>, tail_lines: usize) -> Merged {
    let mut entries: Vec<LogEntry> = per_source.into_iter().flatten().collect();
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    if entries.len() > tail_lines {
        let excess = entries.len() - tail_lines;
        entries.drain(..excess);
    }

    let mut contributing_sources: Vec<String> = Vec::new();
    for entry in &entries {
        if !contributing_sources.iter().any(|s| s == &entry.source) {
            contributing_sources.push(entry.source.clone());
        }
    }

    Merged {
        entries,
        contributing_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Level, LevelFilter};
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 13)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    fn lines(texts: &[&str]) -> Vec<(u64, String)> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u64 + 1, (*t).to_string()))
            .collect()
    }

    fn parse(source: &str, texts: &[&str]) -> Vec<LogEntry> {
        parse_source(
            source,
            lines(texts),
            &LineParser::default(),
            &EntryFilter::pass_all(now()),
        )
    }

    #[test]
    fn test_parse_source_skips_blank_lines_and_keeps_numbers() {
        let entries = parse("renumber", &["first", "", "   ", "fourth"]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].line_number, 1);
        assert_eq!(entries[1].line_number, 4);
    }

    #[test]
    fn test_parse_source_trims_lines() {
        let entries = parse("renumber", &["  [ERROR] boom  \r"]);
        assert_eq!(entries[0].raw_line, "[ERROR] boom");
        assert_eq!(entries[0].message, "boom");
    }

    #[test]
    fn test_parse_source_applies_filter() {
        let filter = EntryFilter {
            level: LevelFilter::Only(Level::Error),
            ..EntryFilter::pass_all(now())
        };
        let entries = parse_source(
            "tycoon",
            lines(&["[INFO] ok", "[ERROR] bad", "\u{2705} done"]),
            &LineParser::default(),
            &filter,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "bad");
    }

    #[test]
    fn test_window_keeps_time_only_lines_from_before_midnight() {
        let after_midnight = NaiveDate::from_ymd_opt(2025, 7, 14)
            .unwrap()
            .and_hms_opt(0, 5, 0)
            .unwrap();
        let filter = EntryFilter {
            window: Some(chrono::Duration::minutes(10)),
            ..EntryFilter::pass_all(after_midnight)
        };
        let entries = parse_source(
            "tycoon",
            lines(&[
                "[23:50:00] too old",
                "[23:58:00] [ERROR] Failed 7 minutes ago",
                "[00:04:00] just now",
            ]),
            &LineParser::default(),
            &filter,
        );

        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["Failed 7 minutes ago", "just now"]);
        assert_eq!(
            entries[0].parsed_timestamp,
            NaiveDate::from_ymd_opt(2025, 7, 13)
                .unwrap()
                .and_hms_opt(23, 58, 0)
        );
        assert!(entries[0].sort_key() < entries[1].sort_key());
    }

    #[test]
    fn test_merge_orders_across_sources() {
        let renumber = parse(
            "renumber",
            &["[2025-07-13 10:00:02] b", "[2025-07-13 10:00:04] d"],
        );
        let tycoon = parse(
            "tycoon",
            &["[2025-07-13 10:00:01] a", "[2025-07-13 10:00:03] c"],
        );
        let merged = merge(vec![renumber, tycoon], 50);
        let messages: Vec<_> = merged.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["a", "b", "c", "d"]);
        assert_eq!(merged.contributing_sources, ["tycoon", "renumber"]);
    }

    #[test]
    fn test_merge_unknown_then_raw_then_resolved() {
        let entries = parse(
            "tycoon",
            &["[2025-07-13 10:00:00] resolved", "[99:00:00] raw", "no timestamp"],
        );
        let merged = merge(vec![entries], 50);
        let messages: Vec<_> = merged.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["no timestamp", "raw", "resolved"]);
    }

    #[test]
    fn test_merge_is_stable_for_equal_keys() {
        let a = parse("renumber", &["one", "two"]);
        let b = parse("tycoon", &["three"]);
        let merged = merge(vec![a, b], 50);
        let messages: Vec<_> = merged.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["one", "two", "three"]);
    }

    #[test]
    fn test_merge_keeps_last_n() {
        let texts: Vec<String> = (0..10)
            .map(|i| format!("[2025-07-13 10:00:{i:02}] m{i}"))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let merged = merge(vec![parse("tycoon", &refs)], 3);
        let messages: Vec<_> = merged.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["m7", "m8", "m9"]);
    }

    #[test]
    fn test_busy_source_can_starve_quiet_source() {
        let quiet = parse("renumber", &["[2025-07-13 09:00:00] early"]);
        let busy = parse(
            "tycoon",
            &[
                "[2025-07-13 10:00:00] x",
                "[2025-07-13 10:00:01] y",
            ],
        );
        let merged = merge(vec![quiet, busy], 2);
        assert_eq!(merged.contributing_sources, ["tycoon"]);
        assert!(merged.entries.iter().all(|e| e.source == "tycoon"));
    }

    #[test]
    fn test_merge_empty() {
        let merged = merge(vec![Vec::new(), Vec::new()], 10);
        assert!(merged.entries.is_empty());
        assert!(merged.contributing_sources.is_empty());
    }
}
