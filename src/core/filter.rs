// Tycoon LogMon - core/filter.rs
//
// Entry filters: a severity predicate and a time-window predicate.
// Both default to "pass everything" and are AND-combined when applied.
// Core layer: pure logic, no I/O. The current time is passed in, never read.

use crate::core::model::{LevelFilter, LogEntry, MonitorRequest};
use chrono::{Duration, NaiveDateTime};

/// Windows are clamped to about 100 years so the duration arithmetic
/// cannot overflow.
const MAX_WINDOW_MINUTES: i64 = 100 * 366 * 24 * 60;

/// Complete filter state for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    /// Level to keep, or the wildcard.
    pub level: LevelFilter,

    /// Keep entries stamped at or after `now - window`. `None` = unbounded.
    pub window: Option<Duration>,

    /// Reference time for the window.
    pub now: NaiveDateTime,
}

impl EntryFilter {
    /// A filter that keeps everything.
    pub fn pass_all(now: NaiveDateTime) -> Self {
        Self {
            level: LevelFilter::All,
            window: None,
            now,
        }
    }

    /// Build the filter a request asks for, anchored at `now`.
    pub fn from_request(request: &MonitorRequest, now: NaiveDateTime) -> Self {
        let window = match request.since_minutes {
            0 => None,
            m => {
                let minutes = i64::try_from(m)
                    .unwrap_or(i64::MAX)
                    .min(MAX_WINDOW_MINUTES);
                Some(Duration::minutes(minutes))
            }
        };
        Self {
            level: request.filter_level,
            window,
            now,
        }
    }

    /// Returns true if no predicate is active.
    pub fn is_empty(&self) -> bool {
        self.level == LevelFilter::All && self.window.is_none()
    }

    /// Severity predicate. Levels are an enum, so the case-insensitive
    /// comparison has already happened when the request was parsed.
    pub fn level_matches(&self, entry: &LogEntry) -> bool {
        match self.level {
            LevelFilter::All => true,
            LevelFilter::Only(level) => entry.level == level,
        }
    }

    /// Time predicate. Only the lower bound is checked: a line written
    /// after `now` was sampled (or by a writer whose clock runs ahead) is
    /// still recent. Entries without a resolved timestamp are kept even
    /// when a window is set: there is nothing to compare against, and
    /// dropping them would hide un-timestamped error lines.
    pub fn time_matches(&self, entry: &LogEntry) -> bool {
        let Some(window) = self.window else {
            return true;
        };
        match entry.parsed_timestamp {
            Some(ts) => ts >= self.now.checked_sub_signed(window).unwrap_or(NaiveDateTime::MIN),
            None => true,
        }
    }

    /// Check if a single entry passes all active predicates.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.level_matches(entry) && self.time_matches(entry)
    }
}

/// Apply a filter, keeping matching entries in their original order.
pub fn apply_filter(entries: Vec<LogEntry>, filter: &EntryFilter) -> Vec<LogEntry> {
    if filter.is_empty() {
        return entries;
    }
    entries.into_iter().filter(|e| filter.matches(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Level;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 13)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn make_entry(level: Level, minutes_ago: Option<i64>) -> LogEntry {
        let parsed = minutes_ago.map(|m| now() - Duration::minutes(m));
        LogEntry {
            source: "renumber".to_string(),
            line_number: 1,
            raw_line: String::new(),
            timestamp: parsed.map(|t| t.to_string()).unwrap_or_default(),
            parsed_timestamp: parsed,
            level,
            message: String::new(),
            glyphs: Vec::new(),
        }
    }

    fn window(level: LevelFilter, minutes: u64) -> EntryFilter {
        let request = MonitorRequest {
            filter_level: level,
            since_minutes: minutes,
            ..Default::default()
        };
        EntryFilter::from_request(&request, now())
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let entries = vec![
            make_entry(Level::Error, Some(5)),
            make_entry(Level::Info, None),
        ];
        let filter = EntryFilter::pass_all(now());
        assert!(filter.is_empty());
        assert_eq!(apply_filter(entries.clone(), &filter), entries);
    }

    #[test]
    fn test_default_request_builds_empty_filter() {
        assert!(EntryFilter::from_request(&MonitorRequest::default(), now()).is_empty());
    }

    #[test]
    fn test_level_filter() {
        let f = window(LevelFilter::Only(Level::Error), 0);
        assert!(f.matches(&make_entry(Level::Error, None)));
        assert!(!f.matches(&make_entry(Level::Success, None)));
        assert!(!f.matches(&make_entry(Level::Info, Some(1))));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let f = window(LevelFilter::All, 10);
        assert!(f.matches(&make_entry(Level::Info, Some(0))));
        assert!(f.matches(&make_entry(Level::Info, Some(10))));
        assert!(!f.matches(&make_entry(Level::Info, Some(11))));
    }

    #[test]
    fn test_window_keeps_entries_written_after_now() {
        let f = window(LevelFilter::All, 10);
        assert!(f.matches(&make_entry(Level::Info, Some(-1))));
    }

    #[test]
    fn test_untimestamped_entries_kept_under_window() {
        let f = window(LevelFilter::All, 1);
        assert!(f.time_matches(&make_entry(Level::Error, None)));
    }

    #[test]
    fn test_predicates_and_combined() {
        let f = window(LevelFilter::Only(Level::Error), 10);
        let entries = vec![
            make_entry(Level::Error, Some(2)),
            make_entry(Level::Error, Some(30)),
            make_entry(Level::Info, Some(2)),
            make_entry(Level::Error, None),
        ];
        let kept = apply_filter(entries, &f);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|e| e.level == Level::Error));
        assert_eq!(kept[0].parsed_timestamp, Some(now() - Duration::minutes(2)));
        assert!(kept[1].parsed_timestamp.is_none());
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let f = window(LevelFilter::All, u64::MAX);
        assert!(f.matches(&make_entry(Level::Info, Some(60 * 24 * 365))));
    }
}
