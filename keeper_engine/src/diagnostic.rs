//! Script diagnostics and the typed errors behind them.
//!
//! Nothing a script does can make the engine API fail. Problems found while
//! loading or running a script are recorded as [`Diagnostic`]s tied to the
//! source line, mirrored to the log, and the offending command is skipped.

use std::fmt;

use log::{error, warn};
use serde::Serialize;

use crate::strings::StringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One problem found in a script line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based line number; 0 for whole-script findings.
    pub line: usize,
    pub command: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.command.is_empty() {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "line {}: {}: {}", self.line, self.command, self.message)
        }
    }
}

/// Append-only diagnostic sink.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn record(&mut self, severity: Severity, line: usize, command: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity,
            line,
            command: command.to_string(),
            message: message.into(),
        };
        match severity {
            Severity::Warning => warn!("script {diagnostic}"),
            Severity::Error => error!("script {diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub fn warning(&mut self, line: usize, command: &str, message: impl Into<String>) {
        self.record(Severity::Warning, line, command, message);
    }

    pub fn error(&mut self, line: usize, command: &str, message: impl Into<String>) {
        self.record(Severity::Error, line, command, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics recorded for one source line.
    pub fn for_line(&self, line: usize) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.line == line)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A bounded table refused a new entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("too many {what} (limit {limit})")]
pub struct CapacityError {
    pub what: &'static str,
    pub limit: usize,
}

/// Check-phase failure: the command is not executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("unrecognized command")]
    UnknownCommand,
    #[error("missing parameter {index} ({kind})")]
    MissingArgument { index: usize, kind: &'static str },
    #[error("invalid {kind} '{value}' in parameter {index}")]
    InvalidArgument {
        index: usize,
        kind: &'static str,
        value: String,
    },
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("{what} {value} outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("{0} is not supported yet")]
    Unsupported(&'static str),
    #[error("{0}")]
    Misplaced(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Strings(#[from] StringError),
}

/// Process-phase failure: this invocation is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("cannot resolve {0}")]
    Unresolved(String),
    #[error("payload shape mismatch: expected {expected}, found {found}")]
    Shape { expected: &'static str, found: &'static str },
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Strings(#[from] StringError),
    #[error("world rejected operation: {0}")]
    World(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_are_filtered_by_severity_and_line() {
        let mut diags = Diagnostics::default();
        diags.warning(3, "SET_FLAG", "value clamped");
        diags.error(4, "IF", "unknown variable 'GOLD'");
        diags.error(4, "IF", "second problem");
        assert_eq!(diags.len(), 3);
        assert_eq!(diags.errors().count(), 2);
        assert_eq!(diags.warnings().count(), 1);
        assert_eq!(diags.for_line(4).count(), 2);
    }

    #[test]
    fn display_includes_line_and_command() {
        let mut diags = Diagnostics::default();
        diags.error(7, "ADD_TO_PARTY", ScriptError::UnknownName {
            kind: "creature",
            name: "DRAGN".into(),
        }.to_string());
        diags.warning(0, "", "no WIN_GAME condition");
        let text: Vec<String> = diags.iter().map(ToString::to_string).collect();
        assert_eq!(text[0], "line 7: ADD_TO_PARTY: unknown creature 'DRAGN'");
        assert_eq!(text[1], "line 0: no WIN_GAME condition");
    }

    #[test]
    fn capacity_error_message() {
        let err = ScriptError::from(CapacityError {
            what: "conditions",
            limit: 48,
        });
        assert_eq!(err.to_string(), "too many conditions (limit 48)");
    }
}
