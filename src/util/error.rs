// Tycoon LogMon - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant keeps the path or value it
// concerns and, where one exists, the underlying cause via `source()`.
//
// Note that most failures in this crate never surface as errors at all:
// missing files are a normal "no logs" outcome, unreadable sources become
// synthetic entries, and unparseable lines become best-effort entries.
// The types below cover what remains.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all monitor operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum MonitorError {
    /// Source resolution failed for a reason other than absence.
    Discovery(DiscoveryError),

    /// A source file could not be read.
    Read(ReadError),

    /// A request failed boundary validation.
    Request(RequestError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Writing the result failed.
    Export(ExportError),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Read(e) => write!(f, "Read error: {e}"),
            Self::Request(e) => write!(f, "Invalid request: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Discovery(e) => Some(e),
            Self::Read(e) => Some(e),
            Self::Request(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Export(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to resolving log sources on disk.
#[derive(Debug)]
pub enum DiscoveryError {
    /// A search directory exists but could not be listed.
    DirectoryUnreadable { path: PathBuf, source: io::Error },

    /// Walkdir failed while listing a search directory.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// A file-name pattern could not be compiled.
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryUnreadable { path, source } => {
                write!(f, "Cannot list directory '{}': {source}", path.display())
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "Invalid file pattern '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryUnreadable { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            Self::InvalidPattern { source, .. } => Some(source),
        }
    }
}

impl From<DiscoveryError> for MonitorError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Read errors
// ---------------------------------------------------------------------------

/// Errors opening or reading one log source.
#[derive(Debug)]
pub enum ReadError {
    /// I/O error while reading a source file.
    Io {
        source_name: String,
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source, .. } => {
                write!(f, "Error reading log file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ReadError> for MonitorError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

/// Boundary validation failures for an incoming monitor request.
#[derive(Debug)]
pub enum RequestError {
    /// `log_type` is not one of the known selectors.
    InvalidLogType { value: String },

    /// `filter_level` is not one of the known levels.
    InvalidFilterLevel { value: String },

    /// `tail_lines` is outside the accepted range.
    TailLinesOutOfRange { value: i64, min: usize, max: usize },

    /// `since_minutes` is negative.
    NegativeSinceMinutes { value: i64 },

    /// The request document is not valid JSON for the request shape.
    Json { source: serde_json::Error },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLogType { value } => write!(
                f,
                "log_type '{value}' is not recognised. Expected one of: all, renumber, tycoon, console"
            ),
            Self::InvalidFilterLevel { value } => write!(
                f,
                "filter_level '{value}' is not recognised. \
                 Expected one of: all, error, success, info, warning"
            ),
            Self::TailLinesOutOfRange { value, min, max } => {
                write!(f, "tail_lines = {value} is out of range ({min}-{max})")
            }
            Self::NegativeSinceMinutes { value } => {
                write!(f, "since_minutes = {value} must be zero or positive")
            }
            Self::Json { source } => write!(f, "malformed request: {source}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source } => Some(source),
            _ => None,
        }
    }
}

impl From<RequestError> for MonitorError {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// A source pattern could not be compiled.
    InvalidPattern {
        field: String,
        pattern: String,
        source: glob::PatternError,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::InvalidPattern {
                field,
                pattern,
                source,
            } => write!(f, "Config '{field}': invalid pattern '{pattern}': {source}"),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidPattern { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::ValueOutOfRange { .. } => None,
        }
    }
}

impl From<ConfigError> for MonitorError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors writing a result or entry stream.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error on the output stream.
    Io { source: io::Error },

    /// CSV serialisation error.
    Csv { source: csv::Error },

    /// JSON serialisation error.
    Json { source: serde_json::Error },
}

impl ExportError {
    /// True when the reader on the other end of the output went away
    /// (e.g. the caller closed the pipe).
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Io { source } => source.kind() == io::ErrorKind::BrokenPipe,
            Self::Json { source } => source.io_error_kind() == Some(io::ErrorKind::BrokenPipe),
            Self::Csv { source } => match source.kind() {
                csv::ErrorKind::Io(e) => e.kind() == io::ErrorKind::BrokenPipe,
                _ => false,
            },
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { source } => write!(f, "output I/O error: {source}"),
            Self::Csv { source } => write!(f, "CSV export error: {source}"),
            Self::Json { source } => write!(f, "JSON export error: {source}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source } => Some(source),
            Self::Csv { source } => Some(source),
            Self::Json { source } => Some(source),
        }
    }
}

impl From<ExportError> for MonitorError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

/// Convenience type alias for monitor results.
pub type Result<T> = std::result::Result<T, MonitorError>;
