// Tycoon LogMon - core/discovery.rs
//
// Log source resolution: maps logical source names to the file to read.
//
// Architecture note: this module uses `walkdir` for directory listing as an
// OS abstraction (similar to using std::path::Path). It reads only file
// *metadata* (type, mtime), never file *contents*; that boundary is owned by
// the app layer (app::monitor).
//
// Absence is a normal outcome here, not an error: a missing file or a missing
// search directory simply resolves to nothing. Only a directory that exists
// but cannot be listed, or an uncompilable pattern, returns `Err`.

use crate::core::model::{LogSource, LogType};
use crate::util::error::DiscoveryError;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// =============================================================================
// Configuration
// =============================================================================

/// How one logical source is located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRule {
    /// A single fixed file.
    File(PathBuf),

    /// The most recently modified file in `directory` whose name matches the
    /// glob `pattern`. The directory is not searched recursively.
    Latest { directory: PathBuf, pattern: String },

    /// No backing file is known. Always resolves to nothing.
    Unresolved,
}

impl SourceRule {
    /// The file or directory this rule looks in, if any.
    pub fn location(&self) -> Option<&Path> {
        match self {
            SourceRule::File(path) => Some(path),
            SourceRule::Latest { directory, .. } => Some(directory),
            SourceRule::Unresolved => None,
        }
    }
}

/// A named source and its resolution rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub rule: SourceRule,
}

impl SourceSpec {
    pub fn new(name: &str, rule: SourceRule) -> Self {
        Self {
            name: name.to_string(),
            rule,
        }
    }
}

/// Outcome of resolving a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Every selected source, in configured order, found or not.
    pub sources: Vec<LogSource>,

    /// Locations consulted, in configured order (files for `File` rules,
    /// directories for `Latest` rules). Falls back to every configured
    /// location when the selection has none of its own.
    pub searched: Vec<PathBuf>,
}

impl Resolution {
    /// Sources that resolved to an existing file.
    pub fn found(&self) -> impl Iterator<Item = &LogSource> {
        self.sources.iter().filter(|s| s.exists)
    }

    /// True if no selected source resolved to a file.
    pub fn is_empty(&self) -> bool {
        self.found().next().is_none()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves log selectors against an injected table of source rules.
#[derive(Debug, Clone)]
pub struct LogSourceResolver {
    specs: Vec<SourceSpec>,
}

impl LogSourceResolver {
    pub fn new(specs: Vec<SourceSpec>) -> Self {
        Self { specs }
    }

    /// Resolve every source selected by `log_type`.
    ///
    /// A selection with nowhere to look (only `Unresolved` sources) records
    /// every configured location as searched, so the no-match diagnostic
    /// still says where logs are expected.
    pub fn resolve(&self, log_type: LogType) -> Result<Resolution, DiscoveryError> {
        let mut resolution = Resolution::default();

        for spec in self.specs.iter().filter(|s| log_type.selects(&s.name)) {
            if let Some(location) = spec.rule.location() {
                resolution.searched.push(location.to_path_buf());
            }
            let path = match &spec.rule {
                SourceRule::File(path) => resolve_file(path),
                SourceRule::Latest { directory, pattern } => latest_matching(directory, pattern)?,
                SourceRule::Unresolved => None,
            };

            tracing::debug!(
                source = %spec.name,
                path = ?path,
                "Source resolved"
            );

            resolution.sources.push(match path {
                Some(p) => LogSource::found(&spec.name, p),
                None => LogSource::unresolved(&spec.name),
            });
        }

        if resolution.searched.is_empty() {
            resolution.searched = self
                .specs
                .iter()
                .filter_map(|s| s.rule.location())
                .map(Path::to_path_buf)
                .collect();
        }

        Ok(resolution)
    }
}

/// A fixed file counts as present unless it is definitely missing or is a
/// directory. A path running through a regular file (`a.log/b.log`) is
/// missing too. Any other metadata failure (e.g. access denied) is left for
/// the reader to report against the source.
fn resolve_file(path: &Path) -> Option<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => None,
        Ok(_) => Some(path.to_path_buf()),
        Err(e) if is_absent(&e) => None,
        Err(e) => {
            tracing::debug!(
                path = %path.display(),
                error = %e,
                "Cannot stat source file; reader will report it"
            );
            Some(path.to_path_buf())
        }
    }
}

fn is_absent(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

/// Pick the newest file in `directory` whose name matches `pattern`.
///
/// Ties on modification time go to the lexicographically greatest path so
/// the choice does not depend on directory listing order. Files whose mtime
/// cannot be read rank as oldest.
pub fn latest_matching(directory: &Path, pattern: &str) -> Result<Option<PathBuf>, DiscoveryError> {
    let compiled = glob::Pattern::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    // Pre-flight: distinguish "missing" (no match) from "present but
    // unreadable" (error). Path::is_dir() would fold both into false.
    match std::fs::metadata(directory) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(None),
        Err(e) if is_absent(&e) => {
            tracing::debug!(directory = %directory.display(), "Search directory does not exist");
            return Ok(None);
        }
        Err(source) => {
            return Err(DiscoveryError::DirectoryUnreadable {
                path: directory.to_path_buf(),
                source,
            });
        }
    }

    let walker = walkdir::WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    let mut best: Option<(SystemTime, PathBuf)> = None;
    let mut candidates = 0usize;

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            // The directory itself failed to open: fatal.
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Traversal {
                    path: directory.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(
                    directory = %directory.display(),
                    error = %e,
                    "Skipping unreadable directory entry"
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            tracing::debug!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
            continue;
        };
        if !compiled.matches(file_name) {
            continue;
        }
        candidates += 1;

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let path = entry.into_path();

        let newer = match &best {
            Some((best_time, best_path)) => (modified, &path) > (*best_time, best_path),
            None => true,
        };
        if newer {
            best = Some((modified, path));
        }
    }

    tracing::debug!(
        directory = %directory.display(),
        pattern,
        candidates,
        "Latest-file search complete"
    );

    Ok(best.map(|(_, path)| path))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn write_with_mtime(path: &Path, content: &str, secs_after_epoch: u64) {
        fs::write(path, content).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    fn resolver_for(dir: &Path) -> LogSourceResolver {
        LogSourceResolver::new(vec![
            SourceSpec::new("renumber", SourceRule::File(dir.join("ReNumber_Debug.log"))),
            SourceSpec::new(
                "tycoon",
                SourceRule::Latest {
                    directory: dir.join("workspace"),
                    pattern: "Tycoon_*.log".to_string(),
                },
            ),
            SourceSpec::new("console", SourceRule::Unresolved),
        ])
    }

    #[test]
    fn test_latest_picks_newest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(&dir.path().join("Tycoon_a.log"), "a", 1_000);
        write_with_mtime(&dir.path().join("Tycoon_b.log"), "b", 3_000);
        write_with_mtime(&dir.path().join("Tycoon_c.log"), "c", 2_000);

        let picked = latest_matching(dir.path(), "Tycoon_*.log").unwrap();
        assert_eq!(picked, Some(dir.path().join("Tycoon_b.log")));
    }

    #[test]
    fn test_latest_tie_breaks_on_path() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(&dir.path().join("Tycoon_1.log"), "", 5_000);
        write_with_mtime(&dir.path().join("Tycoon_2.log"), "", 5_000);

        let picked = latest_matching(dir.path(), "Tycoon_*.log").unwrap();
        assert_eq!(picked, Some(dir.path().join("Tycoon_2.log")));
    }

    #[test]
    fn test_latest_ignores_non_matching_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(&dir.path().join("Tycoon_old.log"), "", 1_000);
        write_with_mtime(&dir.path().join("Other_new.log"), "", 9_000);
        write_with_mtime(&dir.path().join("Tycoon_x.txt"), "", 9_000);
        let sub = dir.path().join("Tycoon_dir.log");
        fs::create_dir(&sub).unwrap();
        write_with_mtime(&sub.join("Tycoon_nested.log"), "", 9_000);

        let picked = latest_matching(dir.path(), "Tycoon_*.log").unwrap();
        assert_eq!(picked, Some(dir.path().join("Tycoon_old.log")));
    }

    #[test]
    fn test_latest_missing_directory_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let picked = latest_matching(&dir.path().join("nope"), "Tycoon_*.log").unwrap();
        assert!(picked.is_none());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = latest_matching(dir.path(), "Tycoon_[.log");
        assert!(matches!(result, Err(DiscoveryError::InvalidPattern { .. })));
    }

    #[test]
    fn test_resolve_all_nothing_present() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = resolver_for(dir.path()).resolve(LogType::All).unwrap();

        assert!(resolution.is_empty());
        assert_eq!(resolution.sources.len(), 3);
        assert!(resolution.sources.iter().all(|s| !s.exists));
        assert_eq!(
            resolution.searched,
            vec![dir.path().join("ReNumber_Debug.log"), dir.path().join("workspace")]
        );
    }

    #[test]
    fn test_resolve_selects_only_requested_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ReNumber_Debug.log"), "x\n").unwrap();
        fs::create_dir(dir.path().join("workspace")).unwrap();
        fs::write(dir.path().join("workspace").join("Tycoon_1.log"), "y\n").unwrap();

        let resolution = resolver_for(dir.path()).resolve(LogType::Tycoon).unwrap();
        assert_eq!(resolution.sources.len(), 1);
        assert_eq!(resolution.sources[0].name, "tycoon");
        assert!(resolution.sources[0].exists);

        let names: Vec<_> = resolver_for(dir.path())
            .resolve(LogType::All)
            .unwrap()
            .found()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, ["renumber", "tycoon"]);
    }

    #[test]
    fn test_console_never_resolves_but_reports_locations() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = resolver_for(dir.path()).resolve(LogType::Console).unwrap();
        assert_eq!(resolution.sources, vec![LogSource::unresolved("console")]);
        assert!(resolution.is_empty());
        assert_eq!(
            resolution.searched,
            vec![dir.path().join("ReNumber_Debug.log"), dir.path().join("workspace")]
        );
    }

    #[test]
    fn test_only_unresolved_sources_searched_is_empty() {
        let resolver = LogSourceResolver::new(vec![SourceSpec::new("console", SourceRule::Unresolved)]);
        let resolution = resolver.resolve(LogType::All).unwrap();
        assert!(resolution.searched.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_path_through_regular_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("Tycoon");
        fs::write(&blocker, "").unwrap();

        let resolver = LogSourceResolver::new(vec![
            SourceSpec::new("renumber", SourceRule::File(blocker.join("ReNumber_Debug.log"))),
            SourceSpec::new(
                "tycoon",
                SourceRule::Latest {
                    directory: blocker.join("workspace"),
                    pattern: "Tycoon_*.log".to_string(),
                },
            ),
        ]);
        let resolution = resolver.resolve(LogType::All).unwrap();
        assert!(resolution.is_empty());
        assert!(resolution.sources.iter().all(|s| !s.exists));
    }

    #[cfg(unix)]
    #[test]
    fn test_unstattable_file_is_left_for_reader() {
        let dir = tempfile::tempdir().unwrap();
        let looped = dir.path().join("loop.log");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        let resolver =
            LogSourceResolver::new(vec![SourceSpec::new("renumber", SourceRule::File(looped.clone()))]);
        let resolution = resolver.resolve(LogType::All).unwrap();
        assert_eq!(resolution.sources, vec![LogSource::found("renumber", looped)]);
    }

    #[test]
    fn test_file_rule_pointing_at_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ReNumber_Debug.log")).unwrap();
        let resolution = resolver_for(dir.path()).resolve(LogType::Renumber).unwrap();
        assert!(resolution.is_empty());
    }
}
