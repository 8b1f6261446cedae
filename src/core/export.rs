// Tycoon LogMon - core/export.rs
//
// JSON, CSV and NDJSON rendering of monitor output.
// Core layer: writes to any Write trait object; the caller owns the stream.

use crate::core::model::{LogEntry, MonitorResult, MonitorStatus};
use crate::util::error::ExportError;
use std::io::Write;

/// CSV column headers, in record order.
const CSV_HEADERS: [&str; 7] = [
    "timestamp",
    "parsed_timestamp",
    "level",
    "source",
    "line",
    "message",
    "raw_line",
];

/// Write a full result as one JSON document followed by a newline.
pub fn export_json<W: Write>(
    result: &MonitorResult,
    mut writer: W,
    pretty: bool,
) -> Result<(), ExportError> {
    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, result)
    } else {
        serde_json::to_writer(&mut writer, result)
    };
    written.map_err(|e| ExportError::Json { source: e })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::Io { source: e })
}

/// Write one entry as a single NDJSON line and flush, so a follower on the
/// other end of a pipe sees it immediately.
pub fn write_ndjson_entry<W: Write>(entry: &LogEntry, writer: &mut W) -> Result<(), ExportError> {
    serde_json::to_writer(&mut *writer, entry).map_err(|e| ExportError::Json { source: e })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::Io { source: e })
}

/// One-line account of a result that is not `success`, for outputs that
/// carry only entry rows. `None` for `success`.
pub fn status_note(result: &MonitorResult) -> Option<String> {
    let status = match result.status {
        MonitorStatus::Success => return None,
        MonitorStatus::NoLogsFound => "no_logs_found",
        MonitorStatus::Error => "error",
    };
    let mut note = format!("{status}: {}", result.message.as_deref().unwrap_or_default());
    if let Some(searched) = result.searched_paths.as_ref().filter(|p| !p.is_empty()) {
        let list: Vec<String> = searched.iter().map(|p| p.display().to_string()).collect();
        note.push_str(&format!(" (searched: {})", list.join(", ")));
    }
    Some(note)
}

/// Export entries as CSV with a header row. Returns the number of rows written.
pub fn export_csv<W: Write>(entries: &[LogEntry], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = CsvEntryWriter::new(writer, true)?;
    for entry in entries {
        csv_writer.write(entry)?;
    }
    csv_writer.flush()?;
    Ok(entries.len())
}

/// Incremental CSV writer, used for both one-shot export and follow streams.
pub struct CsvEntryWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> CsvEntryWriter<W> {
    /// Wrap `writer`, emitting the header row first when `header` is set.
    pub fn new(writer: W, header: bool) -> Result<Self, ExportError> {
        let mut inner = csv::Writer::from_writer(writer);
        if header {
            inner
                .write_record(CSV_HEADERS)
                .map_err(|e| ExportError::Csv { source: e })?;
        }
        Ok(Self { inner })
    }

    pub fn write(&mut self, entry: &LogEntry) -> Result<(), ExportError> {
        let parsed = entry
            .parsed_timestamp
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .unwrap_or_default();
        let line = entry.line_number.to_string();
        self.inner
            .write_record([
                entry.timestamp.as_str(),
                parsed.as_str(),
                entry.level.as_str(),
                entry.source.as_str(),
                line.as_str(),
                entry.message.as_str(),
                entry.raw_line.as_str(),
            ])
            .map_err(|e| ExportError::Csv { source: e })
    }

    pub fn flush(&mut self) -> Result<(), ExportError> {
        self.inner.flush().map_err(|e| ExportError::Io { source: e })
    }
}
