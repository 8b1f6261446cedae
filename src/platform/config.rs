// Tycoon LogMon - platform/config.rs
//
// Platform directory resolution, the default log source table, and
// config.toml loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::discovery::{SourceRule, SourceSpec};
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::{BaseDirs, ProjectDirs};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved platform paths for the monitor and for the host's log locations.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// This tool's configuration directory (holds config.toml).
    pub config_dir: PathBuf,

    /// The host add-in's per-user directory (e.g. %APPDATA%\Tycoon\).
    pub host_config_dir: PathBuf,

    /// Workspace directory the host writes per-session logs into.
    pub workspace_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let config_dir = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                PathBuf::from(".")
            }
        };

        let base = BaseDirs::new();
        let host_config_dir = base
            .as_ref()
            .map(|b| b.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::HOST_CONFIG_SUBDIR);

        #[cfg(windows)]
        let workspace_dir = PathBuf::from(constants::DEFAULT_WORKSPACE_DIR);
        #[cfg(not(windows))]
        let workspace_dir = base
            .as_ref()
            .map(|b| b.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::DEFAULT_WORKSPACE_DIR_NAME);

        tracing::debug!(
            config = %config_dir.display(),
            host = %host_config_dir.display(),
            workspace = %workspace_dir.display(),
            "Platform paths resolved"
        );

        Self {
            config_dir,
            host_config_dir,
            workspace_dir,
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }

    /// Built-in source table: renumber, tycoon, console, in that order.
    pub fn default_sources(&self) -> Vec<SourceSpec> {
        vec![
            SourceSpec::new(
                constants::SOURCE_RENUMBER,
                SourceRule::File(self.host_config_dir.join(constants::RENUMBER_LOG_FILE_NAME)),
            ),
            SourceSpec::new(
                constants::SOURCE_TYCOON,
                SourceRule::Latest {
                    directory: self.workspace_dir.clone(),
                    pattern: constants::TYCOON_LOG_PATTERN.to_string(),
                },
            ),
            SourceSpec::new(constants::SOURCE_CONSOLE, SourceRule::Unresolved),
        ]
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[sources.<name>]` tables.
    pub sources: BTreeMap<String, RawSource>,
    /// `[tail]` section.
    pub tail: TailSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// One `[sources.<name>]` table.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawSource {
    /// "file", "latest" or "none".
    pub kind: Option<String>,
    /// File path for `kind = "file"`.
    pub path: Option<String>,
    /// Search directory for `kind = "latest"`.
    pub directory: Option<String>,
    /// File-name glob for `kind = "latest"`.
    pub pattern: Option<String>,
}

/// `[tail]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TailSection {
    /// Follow-mode poll interval in ms.
    pub poll_interval_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Source table handed to the resolver, in resolution order.
    pub sources: Vec<SourceSpec>,
    /// Follow-mode poll interval.
    pub poll_interval_ms: u64,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Built-in defaults for the given platform paths.
    pub fn defaults(paths: &PlatformPaths) -> Self {
        Self {
            sources: paths.default_sources(),
            poll_interval_ms: constants::TAIL_POLL_INTERVAL_MS,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate config.toml.
///
/// With `explicit = None` the default location is used: a missing file is a
/// silent first run, and an unreadable or unparseable file falls back to
/// defaults with a warning. A file named explicitly must exist and parse, or
/// a `ConfigError` is returned.
///
/// Individual invalid values never fail the load: each produces a warning
/// and keeps its default.
pub fn load_config(
    paths: &PlatformPaths,
    explicit: Option<&Path>,
) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let defaults = AppConfig::defaults(paths);
    let mut warnings: Vec<String> = Vec::new();

    let config_path = match explicit {
        Some(p) => p.to_path_buf(),
        None => paths.config_file(),
    };

    if explicit.is_none() && !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return Ok((defaults, warnings));
    }

    let parsed = std::fs::read_to_string(&config_path)
        .map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })
        .and_then(|content| {
            toml::from_str::<RawConfig>(&content).map_err(|source| ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            })
        });

    let raw = match parsed {
        Ok(raw) => raw,
        Err(e) if explicit.is_some() => return Err(e),
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((defaults, warnings));
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, defaults, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    Ok((config, warnings))
}

/// Apply a parsed config on top of `defaults`, accumulating warnings.
pub fn validate(raw: RawConfig, defaults: AppConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = defaults;

    // -- Sources: known names are replaced in place, new names appended --
    for (name, source) in raw.sources {
        let Some(rule) = source_rule(&name, &source, warnings) else {
            continue;
        };
        match config.sources.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.rule = rule,
            None => config.sources.push(SourceSpec { name, rule }),
        }
    }

    // -- Tail: poll_interval_ms --
    if let Some(ms) = raw.tail.poll_interval_ms {
        if (constants::MIN_TAIL_POLL_INTERVAL_MS..=constants::MAX_TAIL_POLL_INTERVAL_MS).contains(&ms) {
            config.poll_interval_ms = ms;
        } else {
            warnings.push(format!(
                "{}. Using default ({}).",
                ConfigError::ValueOutOfRange {
                    field: "tail.poll_interval_ms".to_string(),
                    value: ms.to_string(),
                    expected: format!(
                        "{}-{}",
                        constants::MIN_TAIL_POLL_INTERVAL_MS,
                        constants::MAX_TAIL_POLL_INTERVAL_MS
                    ),
                },
                constants::TAIL_POLL_INTERVAL_MS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: {}. Using default ({}).",
                constants::VALID_LOG_LEVELS.join(", "),
                constants::DEFAULT_LOG_LEVEL,
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(PathBuf::from(file));
        }
    }

    config
}

/// Build the rule for one `[sources.<name>]` table, or warn and return `None`.
fn source_rule(name: &str, raw: &RawSource, warnings: &mut Vec<String>) -> Option<SourceRule> {
    let kind = raw.kind.as_deref().unwrap_or("").to_lowercase();
    match kind.as_str() {
        "file" => match raw.path.as_deref() {
            Some(path) if !path.is_empty() => Some(SourceRule::File(PathBuf::from(path))),
            _ => {
                warnings.push(format!(
                    "[sources.{name}] kind = \"file\" requires a non-empty 'path'. Keeping default."
                ));
                None
            }
        },
        "latest" => {
            let Some(directory) = raw.directory.as_deref().filter(|d| !d.is_empty()) else {
                warnings.push(format!(
                    "[sources.{name}] kind = \"latest\" requires a non-empty 'directory'. Keeping default."
                ));
                return None;
            };
            let pattern = raw
                .pattern
                .clone()
                .unwrap_or_else(|| constants::TYCOON_LOG_PATTERN.to_string());
            if let Err(source) = glob::Pattern::new(&pattern) {
                let err = ConfigError::InvalidPattern {
                    field: format!("sources.{name}.pattern"),
                    pattern,
                    source,
                };
                warnings.push(format!("{err}. Keeping default."));
                return None;
            }
            Some(SourceRule::Latest {
                directory: PathBuf::from(directory),
                pattern,
            })
        }
        "none" => Some(SourceRule::Unresolved),
        other => {
            warnings.push(format!(
                "[sources.{name}] kind = \"{other}\" is not recognised. \
                 Expected \"file\", \"latest\" or \"none\". Keeping default."
            ));
            None
        }
    }
}
