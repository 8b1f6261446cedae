// Tycoon LogMon - core/classify.rs
//
// Heuristic severity classification by marker matching.
// The policy is data: an ordered list of (level, markers) rules evaluated
// first-match-wins against the full raw line. Core layer: pure logic.

use crate::core::model::Level;
use crate::util::constants;

/// One classification rule: any marker present in the line assigns `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub level: Level,
    pub markers: Vec<String>,
}

impl ClassificationRule {
    pub fn new(level: Level, markers: &[&str]) -> Self {
        Self {
            level,
            markers: markers.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    /// Markers are case-sensitive substrings: "ERROR" matches, "error" does not.
    pub fn matches(&self, line: &str) -> bool {
        self.markers.iter().any(|m| line.contains(m.as_str()))
    }
}

/// Ordered rule set with a fallback level.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
    fallback: Level,
}

impl Default for Classifier {
    /// Error, then warning, then success, then info; unmatched lines are info.
    fn default() -> Self {
        Self::new(
            vec![
                ClassificationRule::new(Level::Error, constants::ERROR_MARKERS),
                ClassificationRule::new(Level::Warning, constants::WARNING_MARKERS),
                ClassificationRule::new(Level::Success, constants::SUCCESS_MARKERS),
                ClassificationRule::new(Level::Info, constants::INFO_MARKERS),
            ],
            Level::Info,
        )
    }
}

impl Classifier {
    pub fn new(rules: Vec<ClassificationRule>, fallback: Level) -> Self {
        Self { rules, fallback }
    }

    /// Level of the first rule with a marker present in `raw_line`.
    pub fn classify(&self, raw_line: &str) -> Level {
        self.rules
            .iter()
            .find(|rule| rule.matches(raw_line))
            .map(|rule| rule.level)
            .unwrap_or(self.fallback)
    }
}
