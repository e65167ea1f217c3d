//! # Error Module
//!
//! Error types for the Sparkling parser core. Every error carries the
//! source location it was detected at, and its `Display` form is the
//! exact diagnostic line the parser contract promises:
//! `Sparkling: syntax error near line N: <message>`.

use std::fmt;

// -----------------------------------------------------------------------------
// SPAN — Source Location
// -----------------------------------------------------------------------------

/// Represents a position in source code.
///
/// Compact 12-byte representation tracking line, column, and length
/// for precise error reporting and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// 1-based line number in the source file.
    pub line: u32,
    /// 1-based column number in the source file.
    pub col: u32,
    /// Length of the spanned region in bytes.
    pub len: u32,
}

impl Span {
    /// Creates a new span at the given location.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }
}

// -----------------------------------------------------------------------------
// ERROR KIND — Pipeline Stage Classification
// -----------------------------------------------------------------------------

/// Classifies which stage of the pipeline produced the error.
///
/// Both stages report as a plain syntax error to the user; the kind
/// exists for programmatic inspection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error during lexical analysis (tokenization).
    Lexer,
    /// Error during parsing (syntax analysis).
    Parser,
}

// -----------------------------------------------------------------------------
// SPARKLING ERROR — Unified Error Type
// -----------------------------------------------------------------------------

/// The unified error type for the Sparkling parser core.
///
/// Every error carries a classification (`kind`), a human-readable
/// `message`, and the `span` where it was detected. The `Display`
/// rendering is stable and doubles as the retained error message a
/// caller may write to its diagnostic sink.
#[derive(Debug, Clone)]
pub struct SparklingError {
    /// Which pipeline stage produced this error.
    pub kind: ErrorKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the error was detected.
    pub span: Span,
}

impl SparklingError {
    /// Creates a new error with a source location.
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Creates a lexer error at the given span.
    #[inline]
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lexer, message, span)
    }

    /// Creates a parser error at the given span.
    #[inline]
    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Parser, message, span)
    }
}

impl fmt::Display for SparklingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sparkling: syntax error near line {}: {}",
            self.span.line, self.message
        )
    }
}

impl std::error::Error for SparklingError {}

/// Convenience type alias for Results throughout the parser core.
pub type SparklingResult<T> = std::result::Result<T, SparklingError>;
