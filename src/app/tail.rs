// Tycoon LogMon - app/tail.rs
//
// Follow mode: after a snapshot, watch the sources it read for lines appended
// later and stream them, parsed and filtered, to the caller.
//
// Architecture:
//   - `FollowManager` lives on the caller's thread; `run_follow_loop` runs on
//     a background thread polling each source on a fixed interval.
//   - An `Arc<AtomicBool>` cancel flag allows the caller to stop following.
//   - New entries are sent as `FollowProgress::NewEntries` over an mpsc
//     channel. A dropped receiver (caller disconnected) also ends the loop.
//   - Each source resumes from the cursor its snapshot ended at, so nothing
//     the snapshot saw is reported twice and nothing written in between is
//     missed.
//
// Robustness:
//   - Stat/read errors on one source are non-fatal: a SourceError message is
//     sent and the loop moves on to the next source.
//   - Truncated or replaced files (size < offset) restart from offset 0 and
//     line 1.
//   - The poll loop sleeps in small slices so cancel is noticed within
//     TAIL_CANCEL_CHECK_INTERVAL_MS.
//   - MAX_TAIL_READ_BYTES_PER_TICK caps bytes read per source per tick;
//     MAX_TAIL_PARTIAL_BYTES caps the carried incomplete line.

use crate::app::monitor::{local_now, SourceCursor};
use crate::core::aggregate;
use crate::core::filter::EntryFilter;
use crate::core::model::{FollowProgress, LogEntry, MonitorRequest};
use crate::core::parser::LineParser;
use crate::platform::fs;
use crate::util::constants::{
    MAX_TAIL_PARTIAL_BYTES, MAX_TAIL_POLL_INTERVAL_MS, MAX_TAIL_READ_BYTES_PER_TICK,
    MIN_TAIL_POLL_INTERVAL_MS, TAIL_CANCEL_CHECK_INTERVAL_MS, TAIL_POLL_INTERVAL_MS,
};
use chrono::NaiveDateTime;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// Public types
// =============================================================================

/// Settings for one follow session.
#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Request whose level filter and time window apply to new lines.
    pub request: MonitorRequest,
    /// Poll interval, clamped to the configured bounds when the loop starts.
    pub poll_interval_ms: u64,
    /// Clock used to anchor the time window on every tick.
    pub clock: fn() -> NaiveDateTime,
}

impl FollowConfig {
    pub fn new(request: MonitorRequest, poll_interval_ms: u64) -> Self {
        Self {
            request,
            poll_interval_ms,
            clock: local_now,
        }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self::new(MonitorRequest::default(), TAIL_POLL_INTERVAL_MS)
    }
}

// =============================================================================
// FollowManager
// =============================================================================

/// Manages a follow loop on a background thread.
pub struct FollowManager {
    /// Channel receiver for the caller to poll progress messages.
    pub progress_rx: Option<mpsc::Receiver<FollowProgress>>,
    /// Cancel flag shared with the background thread.
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl FollowManager {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start following from the given cursors.
    ///
    /// Spawns the poll thread immediately. A follow already running is
    /// stopped first.
    pub fn start(&mut self, cursors: Vec<SourceCursor>, parser: LineParser, config: FollowConfig) {
        self.stop();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        let source_count = cursors.len();
        std::thread::spawn(move || {
            run_follow_loop(cursors, parser, config, tx, cancel);
        });

        tracing::info!(sources = source_count, "Follow started");
    }

    /// Ask the background thread to stop. It exits within
    /// `TAIL_CANCEL_CHECK_INTERVAL_MS`.
    pub fn stop(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
        }
        self.cancel_flag = None;
        self.progress_rx = None;
    }

    /// Returns `true` if a follow thread is currently active.
    pub fn is_active(&self) -> bool {
        self.cancel_flag.is_some()
    }

    /// Drain all queued progress messages without blocking.
    pub fn poll_progress(&self) -> Vec<FollowProgress> {
        let mut messages = Vec::new();
        if let Some(ref rx) = self.progress_rx {
            while let Ok(msg) = rx.try_recv() {
                messages.push(msg);
            }
        }
        messages
    }

    /// Block for the next progress message, up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<FollowProgress, mpsc::RecvTimeoutError> {
        match self.progress_rx {
            Some(ref rx) => rx.recv_timeout(timeout),
            None => Err(mpsc::RecvTimeoutError::Disconnected),
        }
    }
}

impl Default for FollowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FollowManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Per-source state
// =============================================================================

/// Read position of one followed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowState {
    pub name: String,
    pub path: PathBuf,
    /// Byte position of the next unread byte.
    pub offset: u64,
    /// Number the next complete line will carry.
    pub next_line: u64,
    /// Bytes after the last newline read so far: an in-progress line.
    pub partial: Vec<u8>,
    /// Set once an in-progress line outgrew `MAX_TAIL_PARTIAL_BYTES`; the
    /// rest of that line is skipped up to its newline.
    pub discarding: bool,
}

impl From<SourceCursor> for FollowState {
    fn from(cursor: SourceCursor) -> Self {
        Self {
            name: cursor.name,
            path: cursor.path,
            offset: cursor.offset,
            next_line: cursor.next_line,
            partial: Vec::new(),
            discarding: false,
        }
    }
}

impl FollowState {
    /// Read whatever was appended since the last call and return the complete
    /// lines, numbered. An incomplete trailing line is carried to the next
    /// call.
    pub fn poll_lines(&mut self) -> io::Result<Vec<(u64, String)>> {
        let current_size = std::fs::metadata(&self.path)?.len();

        if current_size < self.offset {
            tracing::info!(
                source = %self.name,
                old_offset = self.offset,
                new_size = current_size,
                "Follow: file truncated or replaced, restarting from the top"
            );
            self.offset = 0;
            self.next_line = 1;
            self.partial.clear();
            self.discarding = false;
        }

        if current_size == self.offset {
            return Ok(Vec::new());
        }

        let available = usize::try_from(current_size - self.offset).unwrap_or(usize::MAX);
        let limit = available.min(MAX_TAIL_READ_BYTES_PER_TICK);
        let mut new_bytes = fs::read_bytes_at(&self.path, self.offset, limit)?;
        // Consumed whether or not they complete a line.
        self.offset += new_bytes.len() as u64;

        if self.discarding {
            let Some(end) = new_bytes.iter().position(|&b| b == b'\n') else {
                return Ok(Vec::new());
            };
            // The oversized line ends here; it keeps its number.
            new_bytes.drain(..=end);
            self.discarding = false;
            self.next_line += 1;
        }
        self.partial.extend_from_slice(&new_bytes);

        let mut lines = Vec::new();
        if let Some(last_nl) = self.partial.iter().rposition(|&b| b == b'\n') {
            let rest = self.partial.split_off(last_nl + 1);
            let complete = std::mem::replace(&mut self.partial, rest);
            for raw in complete.split_inclusive(|&b| b == b'\n') {
                lines.push((self.next_line, fs::decode_line(raw)));
                self.next_line += 1;
            }
        }

        if self.partial.len() > MAX_TAIL_PARTIAL_BYTES {
            tracing::warn!(
                source = %self.name,
                line = self.next_line,
                bytes = self.partial.len(),
                "Follow: unterminated line exceeds limit, skipping it"
            );
            self.partial.clear();
            self.discarding = true;
        }

        Ok(lines)
    }
}

// =============================================================================
// Background follow loop
// =============================================================================

/// Poll loop. Checks each source every poll interval and sends new, filtered
/// entries back via `tx`.
fn run_follow_loop(
    cursors: Vec<SourceCursor>,
    parser: LineParser,
    config: FollowConfig,
    tx: mpsc::Sender<FollowProgress>,
    cancel: Arc<AtomicBool>,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                // Receiver dropped: the caller has gone away.
                tracing::debug!("Follow: receiver dropped, exiting");
                return;
            }
        };
    }

    let mut states: Vec<FollowState> = cursors.into_iter().map(FollowState::from).collect();
    send!(FollowProgress::Started {
        source_count: states.len(),
    });

    let interval = config
        .poll_interval_ms
        .clamp(MIN_TAIL_POLL_INTERVAL_MS, MAX_TAIL_POLL_INTERVAL_MS);
    let slices = (interval / TAIL_CANCEL_CHECK_INTERVAL_MS).max(1);

    loop {
        for _ in 0..slices {
            std::thread::sleep(Duration::from_millis(TAIL_CANCEL_CHECK_INTERVAL_MS));
            if cancel.load(Ordering::SeqCst) {
                send!(FollowProgress::Stopped);
                return;
            }
        }

        let filter = EntryFilter::from_request(&config.request, (config.clock)());

        for state in &mut states {
            if cancel.load(Ordering::SeqCst) {
                send!(FollowProgress::Stopped);
                return;
            }

            let entries: Vec<LogEntry> = match state.poll_lines() {
                Ok(lines) if lines.is_empty() => continue,
                Ok(lines) => aggregate::parse_source(&state.name, lines, &parser, &filter),
                Err(e) => {
                    tracing::warn!(source = %state.name, error = %e, "Follow: read error");
                    send!(FollowProgress::SourceError {
                        source: state.name.clone(),
                        message: format!("Error reading log file {}: {e}", state.path.display()),
                    });
                    continue;
                }
            };

            if entries.is_empty() {
                continue;
            }

            tracing::debug!(source = %state.name, count = entries.len(), "Follow: new entries");
            send!(FollowProgress::NewEntries { entries });
        }
    }
}
