// Tycoon LogMon - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.
//
// All of them are created fresh per request and dropped once the response is
// written; nothing here is persisted between calls.

use crate::util::constants;
use crate::util::error::RequestError;
use chrono::NaiveDateTime;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Level
// =============================================================================

/// Classified severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl Level {
    /// Returns all variants.
    pub fn all() -> &'static [Level] {
        &[Level::Info, Level::Warning, Level::Error, Level::Success]
    }

    /// Wire label, as used in requests and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Success => "success",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Level::all()
            .iter()
            .copied()
            .find(|l| l.as_str() == lower)
            .ok_or_else(|| RequestError::InvalidFilterLevel {
                value: s.to_string(),
            })
    }
}

/// Requested severity filter: the wildcard or exactly one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Only(Level),
}

impl LevelFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelFilter::All => constants::WILDCARD,
            LevelFilter::Only(level) => level.as_str(),
        }
    }
}

impl FromStr for LevelFilter {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(constants::WILDCARD) {
            Ok(LevelFilter::All)
        } else {
            s.parse().map(LevelFilter::Only)
        }
    }
}

// =============================================================================
// Log type selector
// =============================================================================

/// Which logical sources a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogType {
    #[default]
    All,
    Renumber,
    Tycoon,
    Console,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::All => constants::WILDCARD,
            LogType::Renumber => constants::SOURCE_RENUMBER,
            LogType::Tycoon => constants::SOURCE_TYCOON,
            LogType::Console => constants::SOURCE_CONSOLE,
        }
    }

    /// True if a source with logical name `name` is selected.
    pub fn selects(&self, name: &str) -> bool {
        match self {
            LogType::All => true,
            other => other.as_str() == name,
        }
    }
}

impl FromStr for LogType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(LogType::All),
            "renumber" => Ok(LogType::Renumber),
            "tycoon" => Ok(LogType::Tycoon),
            "console" => Ok(LogType::Console),
            _ => Err(RequestError::InvalidLogType {
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Log entry (normalised output of parsing)
// =============================================================================

/// One parsed log line.
///
/// `contains_error` and `contains_success` are not stored: they are derived
/// from `level` on access and when serialised, so they can never disagree
/// with the classification.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Logical name of the owning source.
    pub source: String,

    /// 1-based line number within the source file. Zero for synthetic entries.
    pub line_number: u64,

    /// Original line text (line terminator stripped).
    pub raw_line: String,

    /// Timestamp text as it appeared in the line, brackets removed.
    /// Empty when the line carries no recognised timestamp.
    pub timestamp: String,

    /// Timestamp resolved to local wall-clock time. `None` when absent or
    /// unparseable.
    pub parsed_timestamp: Option<NaiveDateTime>,

    /// Classified severity.
    pub level: Level,

    /// Line text with timestamp and recognised prefixes removed.
    pub message: String,

    /// Marker glyphs in order of appearance, duplicates kept.
    pub glyphs: Vec<char>,
}

impl LogEntry {
    pub fn contains_error(&self) -> bool {
        self.level == Level::Error
    }

    pub fn contains_success(&self) -> bool {
        self.level == Level::Success
    }

    /// Best-available ordering key for the cross-source merge.
    pub fn sort_key(&self) -> SortKey<'_> {
        match (self.parsed_timestamp, self.timestamp.is_empty()) {
            (Some(ts), _) => SortKey::Resolved(ts),
            (None, false) => SortKey::Raw(&self.timestamp),
            (None, true) => SortKey::Unknown,
        }
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let glyphs: Vec<String> = self.glyphs.iter().map(|c| c.to_string()).collect();
        let mut s = serializer.serialize_struct("LogEntry", 10)?;
        s.serialize_field("source", &self.source)?;
        s.serialize_field("line_number", &self.line_number)?;
        s.serialize_field("raw_line", &self.raw_line)?;
        s.serialize_field("timestamp", &self.timestamp)?;
        s.serialize_field("parsed_timestamp", &self.parsed_timestamp)?;
        s.serialize_field("level", &self.level)?;
        s.serialize_field("message", &self.message)?;
        s.serialize_field("glyphs", &glyphs)?;
        s.serialize_field("contains_error", &self.contains_error())?;
        s.serialize_field("contains_success", &self.contains_success())?;
        s.end()
    }
}

/// Merge ordering key.
///
/// Variant order is significant: entries with no timestamp sort first, then
/// entries whose timestamp text could not be resolved (compared as text),
/// then resolved timestamps in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey<'a> {
    Unknown,
    Raw(&'a str),
    Resolved(NaiveDateTime),
}

// =============================================================================
// Log source
// =============================================================================

/// A logical log stream and where (if anywhere) it was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    /// Logical name (`renumber`, `tycoon`, `console`, ...).
    pub name: String,

    /// Resolved file path, `None` if nothing matched.
    pub path: Option<PathBuf>,

    /// Whether the resolved file exists.
    pub exists: bool,
}

impl LogSource {
    pub fn unresolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            exists: false,
        }
    }

    pub fn found(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path: Some(path),
            exists: true,
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// Request exactly as received at the boundary, before validation.
///
/// Every field has a default so that `{}` is a valid request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawMonitorRequest {
    pub log_type: String,
    pub tail_lines: i64,
    pub follow: bool,
    pub filter_level: String,
    pub since_minutes: i64,
}

impl Default for RawMonitorRequest {
    fn default() -> Self {
        Self {
            log_type: constants::WILDCARD.to_string(),
            tail_lines: constants::DEFAULT_TAIL_LINES as i64,
            follow: false,
            filter_level: constants::WILDCARD.to_string(),
            since_minutes: constants::UNBOUNDED_SINCE_MINUTES as i64,
        }
    }
}

impl RawMonitorRequest {
    /// Parse a JSON request document.
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        serde_json::from_str(text).map_err(|e| RequestError::Json { source: e })
    }
}

/// Validated monitor request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRequest {
    pub log_type: LogType,
    pub tail_lines: usize,
    /// Live-tail flag. The one-shot monitor never reads it; the front end uses
    /// it to decide whether to start a follow loop after the snapshot.
    pub follow: bool,
    pub filter_level: LevelFilter,
    /// Window size in minutes; 0 means unbounded.
    pub since_minutes: u64,
}

impl Default for MonitorRequest {
    fn default() -> Self {
        Self {
            log_type: LogType::All,
            tail_lines: constants::DEFAULT_TAIL_LINES,
            follow: false,
            filter_level: LevelFilter::All,
            since_minutes: constants::UNBOUNDED_SINCE_MINUTES,
        }
    }
}

impl MonitorRequest {
    /// Human-readable description of the applied time window.
    pub fn time_range(&self) -> String {
        if self.since_minutes > 0 {
            format!("Last {} minutes", self.since_minutes)
        } else {
            "All available".to_string()
        }
    }
}

impl TryFrom<RawMonitorRequest> for MonitorRequest {
    type Error = RequestError;

    fn try_from(raw: RawMonitorRequest) -> Result<Self, Self::Error> {
        let log_type: LogType = raw.log_type.parse()?;
        let filter_level: LevelFilter = raw.filter_level.parse()?;

        let tail_lines = usize::try_from(raw.tail_lines)
            .ok()
            .filter(|n| (constants::MIN_TAIL_LINES..=constants::MAX_TAIL_LINES).contains(n))
            .ok_or(RequestError::TailLinesOutOfRange {
                value: raw.tail_lines,
                min: constants::MIN_TAIL_LINES,
                max: constants::MAX_TAIL_LINES,
            })?;

        let since_minutes = u64::try_from(raw.since_minutes).map_err(|_| {
            RequestError::NegativeSinceMinutes {
                value: raw.since_minutes,
            }
        })?;

        Ok(Self {
            log_type,
            tail_lines,
            follow: raw.follow,
            filter_level,
            since_minutes,
        })
    }
}

// =============================================================================
// Result
// =============================================================================

/// Overall outcome of one monitor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Success,
    NoLogsFound,
    Error,
}

/// Diagnostic metadata attached to every result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitoringInfo {
    /// Whether each selected source resolved to an existing file.
    pub source_exists: BTreeMap<String, bool>,

    /// Resolved path of each source that exists.
    pub resolved_paths: BTreeMap<String, PathBuf>,

    /// Sources with at least one entry in the returned list.
    pub contributing_sources: Vec<String>,

    /// Sources that could not be read, with the failure reason.
    pub read_errors: BTreeMap<String, String>,

    /// When this response was produced (ISO-8601, local time).
    pub last_updated: String,
}

/// Response to one monitor call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorResult {
    pub status: MonitorStatus,

    /// Explanation for `no_logs_found` and `error` outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Names of the sources that resolved to a file, in configured order.
    pub log_files_monitored: Vec<String>,

    pub total_entries: usize,

    /// Echo of the requested level filter.
    pub filter_applied: String,

    /// Human-readable description of the applied time window.
    pub time_range: String,

    pub entries: Vec<LogEntry>,

    /// Paths searched when nothing was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searched_paths: Option<Vec<PathBuf>>,

    pub monitoring_info: MonitoringInfo,
}

impl MonitorResult {
    /// Terminal error response: empty entry list and a failure message.
    pub fn error(request: &MonitorRequest, message: String, last_updated: String) -> Self {
        Self {
            status: MonitorStatus::Error,
            message: Some(message),
            log_files_monitored: Vec::new(),
            total_entries: 0,
            filter_applied: request.filter_level.as_str().to_string(),
            time_range: request.time_range(),
            entries: Vec::new(),
            searched_paths: None,
            monitoring_info: MonitoringInfo {
                last_updated,
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// Follow progress (for the live-tail loop)
// =============================================================================

/// Messages sent from the follow thread to its consumer.
#[derive(Debug, Clone)]
pub enum FollowProgress {
    /// The poll loop is running.
    Started { source_count: usize },

    /// New entries appended since the last poll, already filtered.
    NewEntries { entries: Vec<LogEntry> },

    /// A source could not be read this tick; the loop continues.
    SourceError { source: String, message: String },

    /// The loop has exited.
    Stopped,
}
