//! Accumulated validation results.

use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Errors, warnings and infos collected for one file.
///
/// Only errors make a file invalid.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub path: PathBuf,
    pub issues: Vec<Issue>,
}

impl Report {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.issues.push(Issue {
            level,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Level::Warning, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn with_level(&self, level: Level) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.level == level)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.with_level(Level::Error).map(|i| i.message.as_str())
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.with_level(Level::Error).count()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_errors_invalidate() {
        let mut report = Report::new(Path::new("x.parquet"));
        report.warning("w");
        report.info("i");
        assert!(report.is_valid());
        report.error("e");
        assert!(!report.is_valid());
        assert_eq!(report.errors().collect::<Vec<_>>(), vec!["e"]);
        assert_eq!(report.issues[0].to_string(), "warning: w");
    }
}
