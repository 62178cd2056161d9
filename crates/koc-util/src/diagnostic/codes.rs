//! Stable numeric diagnostic codes.
//!
//! Codes are grouped by phase: 1xxx lexer, 2xxx parser, 3xxx KIR
//! generation, 4xxx sema. Once published a code never changes meaning.

use std::fmt;

/// A stable diagnostic code with a short machine-readable name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    pub code: u16,
    pub name: &'static str,
}

impl DiagnosticCode {
    pub const fn new(code: u16, name: &'static str) -> Self {
        Self { code, name }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code)
    }
}

// Lexer
pub const UNKNOWN_CHARACTER: DiagnosticCode = DiagnosticCode::new(1001, "unknown_character");
pub const UNTERMINATED_LITERAL: DiagnosticCode = DiagnosticCode::new(1002, "unterminated_literal");
pub const EMPTY_BLOCK_COMMENT: DiagnosticCode = DiagnosticCode::new(1003, "empty_block_comment");

// Parser
pub const UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new(2001, "unexpected_token");
pub const MISSING_SEMICOLON: DiagnosticCode = DiagnosticCode::new(2002, "missing_semicolon");
pub const MULTIPLE_UNARY_OPS: DiagnosticCode = DiagnosticCode::new(2003, "multiple_unary_ops");

// KIR generation
pub const DUPLICATE_SYMBOL: DiagnosticCode = DiagnosticCode::new(3001, "duplicate_symbol");
pub const DUPLICATE_LABEL: DiagnosticCode = DiagnosticCode::new(3002, "duplicate_label");
pub const KEYWORD_AS_NAME: DiagnosticCode = DiagnosticCode::new(3003, "keyword_as_name");
pub const UNKNOWN_LABEL: DiagnosticCode = DiagnosticCode::new(3004, "unknown_label");
pub const CANNOT_DISCARD: DiagnosticCode = DiagnosticCode::new(3005, "cannot_discard");
pub const UNKNOWN_IMPORT: DiagnosticCode = DiagnosticCode::new(3006, "unknown_import");
pub const SELF_IMPORT: DiagnosticCode = DiagnosticCode::new(3007, "self_import");
pub const UNSUPPORTED_CONSTRUCT: DiagnosticCode = DiagnosticCode::new(3008, "unsupported_construct");

// Sema
pub const MISMATCHED_TYPES: DiagnosticCode = DiagnosticCode::new(4001, "mismatched_types");
pub const CANNOT_FIT_INT: DiagnosticCode = DiagnosticCode::new(4002, "cannot_fit_int");
pub const CANNOT_CAST: DiagnosticCode = DiagnosticCode::new(4003, "cannot_cast");
pub const DIVISION_BY_ZERO: DiagnosticCode = DiagnosticCode::new(4004, "division_by_zero");
pub const CIRCULAR_DEPENDENCY: DiagnosticCode = DiagnosticCode::new(4005, "circular_dependency");
pub const UNKNOWN_SYMBOL: DiagnosticCode = DiagnosticCode::new(4006, "unknown_symbol");
pub const CONST_EVAL_OVERFLOW: DiagnosticCode = DiagnosticCode::new(4007, "const_eval_overflow");
pub const EXPECTED_VALUE: DiagnosticCode = DiagnosticCode::new(4008, "expected_value");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(format!("{}", UNEXPECTED_TOKEN), "E2001");
        assert_eq!(format!("{}", CIRCULAR_DEPENDENCY), "E4005");
    }

    #[test]
    fn test_codes_unique() {
        let all = [
            UNKNOWN_CHARACTER,
            UNTERMINATED_LITERAL,
            EMPTY_BLOCK_COMMENT,
            UNEXPECTED_TOKEN,
            MISSING_SEMICOLON,
            MULTIPLE_UNARY_OPS,
            DUPLICATE_SYMBOL,
            DUPLICATE_LABEL,
            KEYWORD_AS_NAME,
            UNKNOWN_LABEL,
            CANNOT_DISCARD,
            UNKNOWN_IMPORT,
            SELF_IMPORT,
            UNSUPPORTED_CONSTRUCT,
            MISMATCHED_TYPES,
            CANNOT_FIT_INT,
            CANNOT_CAST,
            DIVISION_BY_ZERO,
            CIRCULAR_DEPENDENCY,
            UNKNOWN_SYMBOL,
            CONST_EVAL_OVERFLOW,
            EXPECTED_VALUE,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code, b.code, "{} and {} collide", a.name, b.name);
            }
        }
    }
}
