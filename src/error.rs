//! Diagnostics and error types.
//!
//! A flat, ingest-attached error enum backed by `thiserror` rather than a
//! hand-written `Display` impl.

use crate::location::{Location, Position};
use std::fmt;

/// The stable, dispatchable kind of a parser diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    InvalidSyntax,
    InvalidValue,
    ReservedCharacter,
    AggregateClosureMismatch,
    ArrayClosureMismatch,
    InvalidAggregateValue,
    MultilineComment,
    MissingCommentEnd,
    MissingQuoteEnd,
    MissingUnitsEnd,
    IngestError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidSyntax => "Invalid Syntax",
            Self::InvalidValue => "Invalid Value",
            Self::ReservedCharacter => "Reserved Character",
            Self::AggregateClosureMismatch => "Aggregate Closure Mismatch",
            Self::ArrayClosureMismatch => "Array Closure Mismatch",
            Self::InvalidAggregateValue => "Invalid Aggregate Value",
            Self::MultilineComment => "Multiline Comment",
            Self::MissingCommentEnd => "Missing Comment End",
            Self::MissingQuoteEnd => "Missing Quote End",
            Self::MissingUnitsEnd => "Missing Units End",
            Self::IngestError => "Ingest Error",
        };
        f.write_str(name)
    }
}

/// A single warning or error recorded while parsing.
///
/// Every diagnostic records its kind, the `Location` it occurred at, a
/// human-readable message, and (when a line-count filter is attached to the
/// source window) the `(line, column)` position of that location.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} at {location}{}: {message}",
    .position.map(|p| format!(" ({p})")).unwrap_or_default())]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    pub position: Option<Position>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        location: Location,
        position: Option<Position>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location,
            position,
            message: message.into(),
        }
    }
}

/// Errors that originate from the underlying byte source rather than from
/// lexical analysis of its content.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// The error raised when the parser is in strict mode and encounters its
/// first diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Strict(Diagnostic),
}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        ParseError::Strict(diagnostic)
    }
}
