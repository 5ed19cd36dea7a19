//! Compiler diagnostics.
//!
//! Every problem found while translating is recorded here with the source
//! location it was found at, and logged through `tracing` as it happens.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, warn};

/// A position in P+ source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.as_os_str().is_empty() {
            write!(f, "{}", self.line)
        } else {
            write!(f, "{}:{}", self.path.display(), self.line)
        }
    }
}

/// Diagnostic severity, ordered from least to most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Use of a deprecated identifier; substitution still happens
    Deprecated,
    /// The offending declaration is rejected, the first one stays in force
    Warning,
    /// Translation continues but the run is marked as failed
    Error,
    /// Translation stops immediately
    Critical,
}

impl Severity {
    /// Whether a diagnostic of this severity fails the run
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Deprecated => "deprecated",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical error",
        };
        f.write_str(label)
    }
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.location, self.severity, self.message)
    }
}

/// Collected diagnostics of one compilation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic
    pub fn report(&mut self, severity: Severity, location: SourceLocation, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity,
            location,
            message: message.into(),
        };

        if severity.is_failure() {
            error!("{diagnostic}");
        } else {
            warn!("{diagnostic}");
        }

        self.entries.push(diagnostic);
    }

    pub fn warning(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Warning, location, message);
    }

    pub fn deprecated(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Deprecated, location, message);
    }

    pub fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Error, location, message);
    }

    pub fn critical(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Critical, location, message);
    }

    /// True once any Error or Critical diagnostic has been recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity.is_failure())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(SourceLocation::new("", 12).to_string(), "12");
        assert_eq!(SourceLocation::new("lib/a.pplib", 3).to_string(), "lib/a.pplib:3");
    }

    #[test]
    fn test_failure_tracking() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(SourceLocation::default(), "redefinition of 'x'");
        diagnostics.deprecated(SourceLocation::default(), "old");
        assert!(!diagnostics.has_errors());

        diagnostics.error(SourceLocation::new("main.pp", 7), "division by zero");
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.count(Severity::Warning), 1);
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(
            diagnostics.entries()[2].to_string(),
            "main.pp:7 error: division by zero"
        );
    }
}
