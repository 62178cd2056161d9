//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Every phase of the compiler reports problems as [`Diagnostic`] records
//! collected per source file. A record carries a severity [`Level`], a
//! stable numeric [`DiagnosticCode`] for tooling, a message, and one or
//! more [`Label`]s pointing at byte ranges in the source.
//!
//! # Examples
//!
//! ```
//! use koc_util::diagnostic::{codes, Diagnostic, Label, Level};
//!
//! let diag = Diagnostic::error(codes::UNEXPECTED_TOKEN, "Unexpected symbol")
//!     .with_label(Label::new("Expected `{`", 10..12));
//!
//! assert_eq!(diag.level, Level::Error);
//! assert_eq!(diag.labels.len(), 1);
//! ```

pub mod codes;

pub use codes::DiagnosticCode;

use std::fmt;
use std::ops::Range;

/// Diagnostic severity level.
///
/// Records are printed grouped per file in this order: errors first, then
/// warnings, then informational notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// An error that fails the compilation
    Error,
    /// A warning that doesn't fail the compilation
    Warning,
    /// Additional information
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Info => write!(f, "info"),
        }
    }
}

/// Highlight color hint for a label, consumed by the terminal renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Default,
    Red,
    Yellow,
    Blue,
}

impl Color {
    /// ANSI escape for this color, empty for [`Color::Default`].
    pub fn ansi(self) -> &'static str {
        match self {
            Color::Default => "",
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
        }
    }
}

/// A highlighted byte range with an explanatory text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub range: Range<usize>,
    pub color: Color,
}

impl Label {
    pub fn new(text: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            text: text.into(),
            range,
            color: Color::Default,
        }
    }

    /// Set the highlight color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// One reported event.
///
/// The current printers render only the first label; the record still
/// carries a list so that multi-label output can grow without changing
/// the type.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub code: DiagnosticCode,
    pub message: String,
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Create a new diagnostic with no labels.
    pub fn new(level: Level, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            labels: Vec::new(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Level::Error, code, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, code, message)
    }

    /// Create an informational diagnostic.
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Level::Info, code, message)
    }

    /// Attach a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// The primary highlighted range, if any label is attached.
    pub fn primary_range(&self) -> Option<&Range<usize>> {
        self.labels.first().map(|l| &l.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
        assert_eq!(format!("{}", Level::Info), "info");
    }

    #[test]
    fn test_diagnostic_labels() {
        let diag = Diagnostic::error(codes::UNEXPECTED_TOKEN, "Unexpected symbol")
            .with_label(Label::new("Expected expression", 3..7).with_color(Color::Red));
        assert_eq!(diag.primary_range(), Some(&(3..7)));
        assert_eq!(diag.labels[0].color, Color::Red);
    }
}
