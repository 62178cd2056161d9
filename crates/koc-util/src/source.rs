//! Source files and their diagnostic sinks.

use std::io::{self, Write};

use crate::diagnostic::{Diagnostic, Level};

/// A source file: path, content, and the diagnostics reported against it.
///
/// The file is the unit of diagnostic grouping; on print, errors come
/// first, then warnings, then informational records.
#[derive(Debug, Default, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    infos: Vec<Diagnostic>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
            infos: Vec::new(),
        }
    }

    /// Record a diagnostic against this file.
    pub fn add(&mut self, diag: Diagnostic) {
        match diag.level {
            Level::Error => self.errors.push(diag),
            Level::Warning => self.warnings.push(diag),
            Level::Info => self.infos.push(diag),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn info_count(&self) -> usize {
        self.infos.len()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let clamped = offset.min(self.content.len());
        let mut line = 1;
        let mut col = 1;
        for byte in self.content.as_bytes()[..clamped].iter() {
            if *byte == b'\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// The full source line containing a byte offset, without its newline.
    pub fn line_at(&self, offset: usize) -> &str {
        let clamped = offset.min(self.content.len());
        let start = self.content[..clamped].rfind('\n').map_or(0, |i| i + 1);
        let end = self.content[start..]
            .find('\n')
            .map_or(self.content.len(), |i| start + i);
        &self.content[start..end]
    }

    /// Print all diagnostics grouped by severity: errors, then warnings,
    /// then informational records.
    pub fn print_diagnostics(&self, out: &mut impl Write) -> io::Result<()> {
        for diag in self.errors.iter().chain(&self.warnings).chain(&self.infos) {
            self.print_one(out, diag)?;
        }
        Ok(())
    }

    fn print_one(&self, out: &mut impl Write, diag: &Diagnostic) -> io::Result<()> {
        writeln!(out, "{}[{}]: {}", diag.level, diag.code, diag.message)?;

        let Some(label) = diag.labels.first() else {
            writeln!(out, " --> {}", self.path)?;
            return Ok(());
        };

        let (line, col) = self.line_col(label.range.start);
        writeln!(out, " --> {}:{}:{}", self.path, line, col)?;

        let text = self.line_at(label.range.start);
        writeln!(out, "  |")?;
        writeln!(out, "{:3} | {}", line, text)?;

        let width = label.range.end.saturating_sub(label.range.start).max(1);
        writeln!(
            out,
            "  | {}{} {}",
            " ".repeat(col.saturating_sub(1)),
            "^".repeat(width.min(text.len().max(1))),
            label.text
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{codes, Label};

    #[test]
    fn test_line_col() {
        let file = SourceFile::new("a.k", "ab\ncd\nef");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(1), (1, 2));
        assert_eq!(file.line_col(3), (2, 1));
        assert_eq!(file.line_col(7), (3, 2));
    }

    #[test]
    fn test_line_at() {
        let file = SourceFile::new("a.k", "ab\ncd\nef");
        assert_eq!(file.line_at(0), "ab");
        assert_eq!(file.line_at(4), "cd");
        assert_eq!(file.line_at(7), "ef");
    }

    #[test]
    fn test_grouping() {
        let mut file = SourceFile::new("a.k", "x");
        file.add(Diagnostic::warning(codes::EMPTY_BLOCK_COMMENT, "w"));
        file.add(Diagnostic::error(codes::UNEXPECTED_TOKEN, "e"));
        assert!(file.has_errors());
        assert_eq!(file.error_count(), 1);
        assert_eq!(file.warning_count(), 1);
    }

    #[test]
    fn test_print_order() {
        let mut file = SourceFile::new("a.k", "let x");
        file.add(Diagnostic::info(codes::UNSUPPORTED_CONSTRUCT, "third"));
        file.add(
            Diagnostic::error(codes::UNEXPECTED_TOKEN, "first")
                .with_label(Label::new("here", 0..3)),
        );
        file.add(Diagnostic::warning(codes::EMPTY_BLOCK_COMMENT, "second"));

        let mut buf = Vec::new();
        file.print_diagnostics(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        let third = text.find("third").unwrap();
        assert!(first < second && second < third);
    }
}
