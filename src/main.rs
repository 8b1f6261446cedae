// Tycoon LogMon - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Request validation (flags or a raw JSON request)
// 4. One monitor call, written to stdout as JSON or CSV
// 5. Optional follow mode, streaming new entries until stdout closes
//
// Diagnostics go to stderr (or the configured log file); stdout carries only
// the result.

use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tycoon_logmon::app::monitor::{local_now, MonitorService, SourceCursor};
use tycoon_logmon::app::tail::{FollowConfig, FollowManager};
use tycoon_logmon::core::export::{self, CsvEntryWriter};
use tycoon_logmon::core::model::{
    FollowProgress, LogEntry, MonitorRequest, MonitorResult, MonitorStatus, RawMonitorRequest,
};
use tycoon_logmon::platform::config::{self, AppConfig, PlatformPaths};
use tycoon_logmon::util::constants;
use tycoon_logmon::util::error::{ExportError, MonitorError};
use tycoon_logmon::util::logging;

/// How long the follow loop waits on the channel before checking again.
const FOLLOW_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Output encoding for results.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Compact JSON (one line); follow mode emits NDJSON.
    Json,
    /// Indented JSON; follow mode emits NDJSON.
    Pretty,
    /// CSV entry rows with a header; follow mode appends rows.
    Csv,
}

/// Tycoon LogMon - inspect recent Tycoon script execution logs.
///
/// Reads the renumber debug log and the newest Tycoon session log, merges them
/// chronologically, and prints the most recent entries.
#[derive(Parser, Debug)]
#[command(name = "tycoon-logmon", version, about)]
struct Cli {
    /// Sources to read: all, renumber, tycoon, console.
    #[arg(short = 't', long = "log-type", default_value = constants::WILDCARD)]
    log_type: String,

    /// Number of most recent entries to return (1-500).
    #[arg(
        short = 'n',
        long = "tail-lines",
        default_value_t = constants::DEFAULT_TAIL_LINES as i64,
        allow_negative_numbers = true
    )]
    tail_lines: i64,

    /// Keep running and stream entries appended after the snapshot.
    #[arg(long)]
    follow: bool,

    /// Level to keep: all, error, warning, success, info.
    #[arg(short = 'f', long = "filter-level", default_value = constants::WILDCARD)]
    filter_level: String,

    /// Only entries from the last N minutes (0 = no limit).
    #[arg(
        short = 's',
        long = "since-minutes",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    since_minutes: i64,

    /// Raw JSON request object; replaces the request flags above.
    #[arg(long, value_name = "JSON")]
    request: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Configuration file (defaults to config.toml in the user config directory).
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

impl Cli {
    fn raw_request(&self) -> Result<RawMonitorRequest, MonitorError> {
        match &self.request {
            Some(json) => Ok(RawMonitorRequest::from_json(json)?),
            None => Ok(RawMonitorRequest {
                log_type: self.log_type.clone(),
                tail_lines: self.tail_lines,
                follow: self.follow,
                filter_level: self.filter_level.clone(),
                since_minutes: self.since_minutes,
            }),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config first: it may set the log level and log file.
    let paths = PlatformPaths::resolve();
    let loaded = config::load_config(&paths, cli.config.as_deref());

    let (app_config, warnings) = match loaded {
        Ok(ok) => ok,
        Err(e) => {
            logging::init(cli.debug, None, None);
            tracing::error!(error = %e, "Configuration could not be loaded");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        sources = app_config.sources.len(),
        "{} starting",
        constants::APP_NAME
    );

    match run(&cli, &app_config) {
        Ok(MonitorStatus::Error) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Validate the request, take the snapshot, print it, and follow if asked.
fn run(cli: &Cli, app_config: &AppConfig) -> Result<MonitorStatus, MonitorError> {
    let request = MonitorRequest::try_from(cli.raw_request()?)?;

    let service = MonitorService::from_config(app_config);
    let snapshot = service.snapshot_at(&request, local_now());
    let status = snapshot.result.status;

    if let Err(e) = print_result(&snapshot.result, cli.format) {
        if e.is_disconnect() {
            tracing::debug!("stdout closed before the result was written");
            return Ok(status);
        }
        return Err(e.into());
    }
    // CSV rows cannot carry the status; say it on stderr instead.
    if cli.format == OutputFormat::Csv {
        if let Some(note) = export::status_note(&snapshot.result) {
            eprintln!("{note}");
        }
    }

    if request.follow {
        if snapshot.cursors.is_empty() {
            tracing::info!(status = ?status, "Nothing to follow");
        } else {
            follow(
                snapshot.cursors,
                &service,
                FollowConfig::new(request, app_config.poll_interval_ms),
                cli.format,
            )?;
        }
    }

    Ok(status)
}

fn print_result(result: &MonitorResult, format: OutputFormat) -> Result<(), ExportError> {
    let stdout = std::io::stdout();
    let lock = stdout.lock();
    match format {
        OutputFormat::Json => export::export_json(result, lock, false),
        OutputFormat::Pretty => export::export_json(result, lock, true),
        OutputFormat::Csv => export::export_csv(&result.entries, lock).map(|_| ()),
    }
}

/// Stream follow output until the follow loop ends or stdout goes away.
fn follow(
    cursors: Vec<SourceCursor>,
    service: &MonitorService,
    config: FollowConfig,
    format: OutputFormat,
) -> Result<(), ExportError> {
    let mut manager = FollowManager::new();
    manager.start(cursors, service.parser().clone(), config);

    let stdout = std::io::stdout();
    let mut sink = EntrySink::new(stdout.lock(), format)?;

    loop {
        let progress = match manager.recv_timeout(FOLLOW_RECV_TIMEOUT) {
            Ok(p) => p,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        match progress {
            FollowProgress::Started { source_count } => {
                tracing::info!(sources = source_count, "Following; close stdout or interrupt to stop");
            }
            FollowProgress::NewEntries { entries } => {
                if let Err(e) = sink.write_all(&entries) {
                    manager.stop();
                    if e.is_disconnect() {
                        tracing::info!("stdout closed; follow stopped");
                        return Ok(());
                    }
                    return Err(e);
                }
            }
            FollowProgress::SourceError { source, message } => {
                tracing::warn!(source = %source, error = %message, "Follow source error");
            }
            FollowProgress::Stopped => break,
        }
    }

    manager.stop();
    Ok(())
}

/// Follow-mode writer: NDJSON lines, or CSV rows continuing the snapshot table.
enum EntrySink<W: Write> {
    Ndjson(W),
    Csv(CsvEntryWriter<W>),
}

impl<W: Write> EntrySink<W> {
    fn new(writer: W, format: OutputFormat) -> Result<Self, ExportError> {
        Ok(match format {
            OutputFormat::Json | OutputFormat::Pretty => Self::Ndjson(writer),
            OutputFormat::Csv => Self::Csv(CsvEntryWriter::new(writer, false)?),
        })
    }

    fn write_all(&mut self, entries: &[LogEntry]) -> Result<(), ExportError> {
        match self {
            Self::Ndjson(w) => entries
                .iter()
                .try_for_each(|e| export::write_ndjson_entry(e, w)),
            Self::Csv(w) => {
                for entry in entries {
                    w.write(entry)?;
                }
                w.flush()
            }
        }
    }
}
