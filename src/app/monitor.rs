// Tycoon LogMon - app/monitor.rs
//
// One-shot monitor pipeline: resolve → read → parse/filter → merge → respond.
//
// Failure boundaries:
//   - A source that cannot be read becomes one synthetic error entry for that
//     source; the other sources are unaffected.
//   - Anything that escapes (currently only resolver failures) is caught once
//     in `snapshot_at` and turned into an `error` result. Callers never see
//     an `Err`.
//
// Each call is independent: no state is kept between calls, so re-invoking
// with the same request against unchanged files yields the same entries.

use crate::core::aggregate;
use crate::core::discovery::LogSourceResolver;
use crate::core::filter::EntryFilter;
use crate::core::model::{
    Level, LogEntry, MonitorRequest, MonitorResult, MonitorStatus, MonitoringInfo,
};
use crate::core::parser::LineParser;
use crate::platform::config::AppConfig;
use crate::platform::fs::{self, TailRead};
use crate::util::constants;
use crate::util::error::{ReadError, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Where a follow loop should resume reading one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCursor {
    /// Logical source name.
    pub name: String,
    /// File being followed.
    pub path: PathBuf,
    /// Byte offset just past the last complete line already reported.
    pub offset: u64,
    /// Line number the next complete line will carry.
    pub next_line: u64,
}

impl SourceCursor {
    fn from_tail(name: &str, path: &Path, read: &TailRead) -> Self {
        // The offset stops before an unterminated last line, so that line is
        // re-read and reported in full, under the same number, once complete.
        let next_line = if read.partial.is_empty() {
            read.total_lines + 1
        } else {
            read.total_lines
        };
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            offset: read.end_offset,
            next_line,
        }
    }
}

/// A monitor result plus the read positions it was taken at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub result: MonitorResult,
    /// One cursor per source that was read successfully.
    pub cursors: Vec<SourceCursor>,
}

/// Current local wall-clock time, the only clock the monitor reads.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Orchestrates one monitor call over an injected source table.
#[derive(Debug, Clone)]
pub struct MonitorService {
    resolver: LogSourceResolver,
    parser: LineParser,
}

impl MonitorService {
    pub fn new(resolver: LogSourceResolver, parser: LineParser) -> Self {
        Self { resolver, parser }
    }

    /// Service over the configured source table with the default parser.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            LogSourceResolver::new(config.sources.clone()),
            LineParser::default(),
        )
    }

    pub fn parser(&self) -> &LineParser {
        &self.parser
    }

    /// Run a request against the current wall clock.
    pub fn monitor(&self, request: &MonitorRequest) -> MonitorResult {
        self.monitor_at(request, local_now())
    }

    /// Run a request as of `now`.
    pub fn monitor_at(&self, request: &MonitorRequest, now: NaiveDateTime) -> MonitorResult {
        self.snapshot_at(request, now).result
    }

    /// Run a request as of `now`, also returning follow cursors.
    pub fn snapshot_at(&self, request: &MonitorRequest, now: NaiveDateTime) -> Snapshot {
        let last_updated = now.format(constants::LAST_UPDATED_FORMAT).to_string();

        match self.try_snapshot(request, now, &last_updated) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Monitor call failed");
                Snapshot {
                    result: MonitorResult::error(
                        request,
                        format!("Error monitoring logs: {e}"),
                        last_updated,
                    ),
                    cursors: Vec::new(),
                }
            }
        }
    }

    fn try_snapshot(
        &self,
        request: &MonitorRequest,
        now: NaiveDateTime,
        last_updated: &str,
    ) -> Result<Snapshot> {
        tracing::debug!(
            log_type = request.log_type.as_str(),
            tail_lines = request.tail_lines,
            filter_level = request.filter_level.as_str(),
            since_minutes = request.since_minutes,
            "Monitor request"
        );

        let resolution = self.resolver.resolve(request.log_type)?;

        let mut info = MonitoringInfo {
            last_updated: last_updated.to_string(),
            ..Default::default()
        };
        for source in &resolution.sources {
            info.source_exists.insert(source.name.clone(), source.exists);
            if let Some(path) = &source.path {
                info.resolved_paths.insert(source.name.clone(), path.clone());
            }
        }

        if resolution.is_empty() {
            tracing::info!(searched = resolution.searched.len(), "No log files found");
            return Ok(Snapshot {
                result: MonitorResult {
                    status: MonitorStatus::NoLogsFound,
                    message: Some(constants::NO_LOGS_MESSAGE.to_string()),
                    log_files_monitored: Vec::new(),
                    total_entries: 0,
                    filter_applied: request.filter_level.as_str().to_string(),
                    time_range: request.time_range(),
                    entries: Vec::new(),
                    searched_paths: Some(resolution.searched),
                    monitoring_info: info,
                },
                cursors: Vec::new(),
            });
        }

        let filter = EntryFilter::from_request(request, now);
        let mut monitored: Vec<String> = Vec::new();
        let mut per_source: Vec<Vec<LogEntry>> = Vec::new();
        let mut cursors: Vec<SourceCursor> = Vec::new();

        for source in resolution.found() {
            let Some(path) = source.path.as_deref() else {
                continue;
            };
            monitored.push(source.name.clone());

            match read_source(&source.name, path, request.tail_lines) {
                Ok(read) => {
                    cursors.push(SourceCursor::from_tail(&source.name, path, &read));
                    per_source.push(aggregate::parse_source(
                        &source.name,
                        read.lines,
                        &self.parser,
                        &filter,
                    ));
                }
                Err(e) => {
                    tracing::warn!(source = %source.name, error = %e, "Source read failed");
                    info.read_errors.insert(source.name.clone(), e.to_string());
                    let entry = read_error_entry(&source.name, &e, now);
                    per_source.push(if filter.matches(&entry) {
                        vec![entry]
                    } else {
                        Vec::new()
                    });
                }
            }
        }

        let merged = aggregate::merge(per_source, request.tail_lines);
        info.contributing_sources = merged.contributing_sources;

        tracing::info!(
            sources = monitored.len(),
            entries = merged.entries.len(),
            read_errors = info.read_errors.len(),
            "Monitor call complete"
        );

        Ok(Snapshot {
            result: MonitorResult {
                status: MonitorStatus::Success,
                message: None,
                log_files_monitored: monitored,
                total_entries: merged.entries.len(),
                filter_applied: request.filter_level.as_str().to_string(),
                time_range: request.time_range(),
                entries: merged.entries,
                searched_paths: None,
                monitoring_info: info,
            },
            cursors,
        })
    }
}

fn read_source(name: &str, path: &Path, tail_lines: usize) -> std::result::Result<TailRead, ReadError> {
    fs::read_tail_lines(path, tail_lines).map_err(|source| ReadError::Io {
        source_name: name.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

/// Entry standing in for a source that could not be read. Stamped with `now`
/// so it survives any time window and sorts with the newest entries.
pub fn read_error_entry(source: &str, error: &ReadError, now: NaiveDateTime) -> LogEntry {
    let message = error.to_string();
    LogEntry {
        source: source.to_string(),
        line_number: 0,
        raw_line: message.clone(),
        timestamp: now.format(constants::SYNTHETIC_TIMESTAMP_FORMAT).to_string(),
        parsed_timestamp: Some(now),
        level: Level::Error,
        message,
        glyphs: Vec::new(),
    }
}
