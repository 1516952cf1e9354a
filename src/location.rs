//! Positions in the filtered virtual character stream.

/// An offset into the cumulative filtered character stream.
///
/// Locations are stable across window slides: once a character has been
/// assigned a `Location` it keeps that value even after the window drops
/// the buffered bytes that held it.
pub type Location = usize;

/// Sentinel meaning "none / not found / end of stream".
pub const NO_LIMIT: Location = usize::MAX;

/// Whether a `Location` is the `NO_LIMIT` sentinel.
#[must_use]
pub fn is_end(location: Location) -> bool {
    location == NO_LIMIT
}

/// A `(line, column)` position, produced by the line-count filter.
///
/// `column` is `NO_LIMIT` when the queried location is beyond every
/// character the window has ever ingested ("position unknown beyond end").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 0 };
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.column == NO_LIMIT {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "line {}, column {}", self.line, self.column)
        }
    }
}
