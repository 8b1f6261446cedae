// Tycoon LogMon - platform/fs.rs
//
// File reading primitives for log sources.
//
// Encoding: log files are read as bytes and decoded per line as lossy UTF-8,
// so a stray invalid byte costs one replacement character, never the file.
// Line terminators (`\n` or `\r\n`) are stripped.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// The last lines of a file, plus where the read stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailRead {
    /// `(line_number, text)` pairs, 1-based and absolute within the file.
    pub lines: Vec<(u64, String)>,

    /// Number of physical lines in the file, counting an unterminated last
    /// line.
    pub total_lines: u64,

    /// Byte offset just past the last complete (newline-terminated) line.
    pub end_offset: u64,

    /// Bytes after the last newline: a line still being written.
    pub partial: Vec<u8>,
}

/// Read the last `n` physical lines of `path` in a single streaming pass.
///
/// Memory is bounded by `n` lines regardless of file size. An unterminated
/// final line is returned as a line (and also reported in `partial`).
pub fn read_tail_lines(path: &Path, n: usize) -> io::Result<TailRead> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut ring: VecDeque<(u64, String)> = VecDeque::with_capacity(n.min(1_024));
    let mut buf: Vec<u8> = Vec::new();
    let mut total_lines = 0u64;
    let mut end_offset = 0u64;
    let mut partial = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        total_lines += 1;

        if buf.last() == Some(&b'\n') {
            end_offset += read as u64;
        } else {
            partial = buf.clone();
        }

        if n == 0 {
            continue;
        }
        if ring.len() == n {
            ring.pop_front();
        }
        ring.push_back((total_lines, decode_line(&buf)));
    }

    tracing::debug!(
        path = %path.display(),
        total_lines,
        kept = ring.len(),
        end_offset,
        "Tail read complete"
    );

    Ok(TailRead {
        lines: ring.into_iter().collect(),
        total_lines,
        end_offset,
        partial,
    })
}

/// Decode one physical line, dropping its terminator.
pub fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read up to `limit` bytes from `path` starting at byte position `offset`.
///
/// Returns fewer bytes than `limit` if the file ends first.
pub fn read_bytes_at(path: &Path, offset: u64, limit: usize) -> io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn texts(read: &TailRead) -> Vec<&str> {
        read.lines.iter().map(|(_, t)| t.as_str()).collect()
    }

    #[test]
    fn test_tail_keeps_last_n_with_absolute_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

        let read = read_tail_lines(&path, 2).unwrap();
        assert_eq!(read.lines, vec![(3, "three".to_string()), (4, "four".to_string())]);
        assert_eq!(read.total_lines, 4);
        assert_eq!(read.end_offset, 19);
        assert!(read.partial.is_empty());
    }

    #[test]
    fn test_tail_larger_than_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "only\n").unwrap();
        let read = read_tail_lines(&path, 50).unwrap();
        assert_eq!(texts(&read), ["only"]);
    }

    #[test]
    fn test_crlf_and_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "first\r\nsecond\r\nhalf").unwrap();

        let read = read_tail_lines(&path, 10).unwrap();
        assert_eq!(texts(&read), ["first", "second", "half"]);
        assert_eq!(read.total_lines, 3);
        assert_eq!(read.end_offset, 15);
        assert_eq!(read.partial, b"half");
    }

    #[test]
    fn test_blank_lines_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "a\n\nb\n").unwrap();
        let read = read_tail_lines(&path, 10).unwrap();
        assert_eq!(
            read.lines,
            vec![(1, "a".to_string()), (2, String::new()), (3, "b".to_string())]
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, b"ok \xFF\xFE bytes\n").unwrap();
        let read = read_tail_lines(&path, 1).unwrap();
        assert_eq!(read.lines[0].1, "ok \u{FFFD}\u{FFFD} bytes");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "").unwrap();
        let read = read_tail_lines(&path, 5).unwrap();
        assert_eq!(read, TailRead::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tail_lines(&dir.path().join("gone.log"), 5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_bytes_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "0123456789").unwrap();
        assert_eq!(read_bytes_at(&path, 3, 4).unwrap(), b"3456");
        assert_eq!(read_bytes_at(&path, 8, 100).unwrap(), b"89");
        assert!(read_bytes_at(&path, 20, 4).unwrap().is_empty());
    }
}
