// Tycoon LogMon - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Anything with a numeric bound or a well-known file name lives here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "Tycoon LogMon";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "TycoonLogMon";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Request bounds
// =============================================================================

/// Default number of lines returned when a request does not specify one.
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Smallest accepted `tail_lines`.
pub const MIN_TAIL_LINES: usize = 1;

/// Largest accepted `tail_lines`. Keeps a single response small enough for an
/// assistant context window.
pub const MAX_TAIL_LINES: usize = 500;

/// `since_minutes` value meaning "no time window".
pub const UNBOUNDED_SINCE_MINUTES: u64 = 0;

/// Wildcard value accepted for `log_type` and `filter_level`.
pub const WILDCARD: &str = "all";

/// Message returned with a `no_logs_found` status.
pub const NO_LOGS_MESSAGE: &str =
    "No log files found. Make sure Tycoon is running and scripts have been executed.";

/// Format of `monitoring_info.last_updated` (ISO-8601, local, microseconds).
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Format of the timestamp text on synthetic read-error entries.
pub const SYNTHETIC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A time-only stamp further than this ahead of the reading time was written
/// yesterday (the log crossed midnight).
pub const TIME_ONLY_FUTURE_SLACK_MINUTES: i64 = 60;

// =============================================================================
// Log sources
// =============================================================================

/// Logical name of the renumber debug log.
pub const SOURCE_RENUMBER: &str = "renumber";

/// Logical name of the per-session Tycoon log.
pub const SOURCE_TYCOON: &str = "tycoon";

/// Logical name of the host console stream (no backing file yet).
pub const SOURCE_CONSOLE: &str = "console";

/// Subdirectory of the per-user config directory written by the host add-in.
pub const HOST_CONFIG_SUBDIR: &str = "Tycoon";

/// Fixed file name of the renumber debug log.
pub const RENUMBER_LOG_FILE_NAME: &str = "ReNumber_Debug.log";

/// Glob matched against file names in the workspace directory.
pub const TYCOON_LOG_PATTERN: &str = "Tycoon_*.log";

/// Workspace directory the host writes timestamp-suffixed logs into.
#[cfg(windows)]
pub const DEFAULT_WORKSPACE_DIR: &str = r"C:\RevitAI";

/// Workspace directory name under the home directory on non-Windows hosts.
#[cfg(not(windows))]
pub const DEFAULT_WORKSPACE_DIR_NAME: &str = "RevitAI";

// =============================================================================
// Classification markers
// =============================================================================
//
// Matched as case-sensitive substrings of the raw line. Rule order is the
// classification priority: error, warning, success, info.

/// Markers that classify a line as an error.
pub const ERROR_MARKERS: &[&str] = &["\u{274C}", "ERROR", "Failed", "Exception"];

/// Markers that classify a line as a warning. The bare warning sign is used so
/// that both the text and emoji presentation forms match.
pub const WARNING_MARKERS: &[&str] = &["\u{26A0}", "WARN", "Warning"];

/// Markers that classify a line as a success.
pub const SUCCESS_MARKERS: &[&str] = &["\u{2705}", "SUCCESS", "completed", "\u{1F525}", "\u{1F4BE}"];

/// Markers that classify a line as informational.
pub const INFO_MARKERS: &[&str] = &["\u{1F50D}", "\u{1F504}", "\u{1F4CA}", "INFO"];

// =============================================================================
// Live tail limits
// =============================================================================

/// How often the follow loop polls each source for new content (ms).
pub const TAIL_POLL_INTERVAL_MS: u64 = 500;

/// How often the cancel flag is checked within each poll sleep interval (ms).
pub const TAIL_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Minimum user-configurable tail poll interval (ms).
pub const MIN_TAIL_POLL_INTERVAL_MS: u64 = 100;

/// Maximum user-configurable tail poll interval (ms).
pub const MAX_TAIL_POLL_INTERVAL_MS: u64 = 10_000; // 10 s

/// Maximum bytes read from a single source in one poll tick.
pub const MAX_TAIL_READ_BYTES_PER_TICK: usize = 512 * 1_024; // 512 KiB

/// Maximum size of the carried-over incomplete line for one source. A file
/// that never writes a newline is discarded past this point instead of
/// growing the buffer without bound.
pub const MAX_TAIL_PARTIAL_BYTES: usize = MAX_TAIL_READ_BYTES_PER_TICK * 4; // 2 MiB

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted values for `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
