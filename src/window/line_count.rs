//! Line/column position tracking filter.
//!
//! Records the `Location` immediately after every `\n` seen during
//! ingestion; `position_of` turns a `Location` back into a `(line, column)`
//! pair by locating it among the recorded newlines.

use super::Filter;
use crate::location::{Location, Position, NO_LIMIT};

/// Records newline locations and answers "what line is this on?" queries.
pub struct LineCountFilter {
    enabled: bool,
    start_position: Position,
    last_location: Location,
    line_starts: Vec<Location>,
}

impl Default for LineCountFilter {
    fn default() -> Self {
        Self::new(Position::START)
    }
}

impl LineCountFilter {
    #[must_use]
    pub fn new(start_position: Position) -> Self {
        LineCountFilter {
            enabled: true,
            start_position,
            last_location: 0,
            line_starts: Vec::new(),
        }
    }

    /// Re-enables the filter, clearing previously recorded newlines and
    /// resetting the starting position.
    pub fn reset(&mut self, start_position: Position) {
        self.enabled = true;
        self.start_position = start_position;
        self.last_location = 0;
        self.line_starts.clear();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The `(line, column)` position of `location`. `column` is `NO_LIMIT`
    /// when `location` is beyond every character ever ingested.
    #[must_use]
    pub fn position_of(&self, location: Location) -> Position {
        let mut position = self.start_position;
        if self.line_starts.is_empty() {
            position.column += location;
            return position;
        }

        match self.line_starts.binary_search(&location) {
            Ok(index) => {
                // Exactly at the beginning of the next line.
                position.line += index + 1;
            }
            Err(index) => {
                if index == self.line_starts.len() {
                    // Beyond the last recorded newline.
                    position.line += self.line_starts.len();
                    if location > self.last_location {
                        position.column = NO_LIMIT;
                    } else {
                        let last_start = self.line_starts[index - 1];
                        position.column = location - last_start;
                    }
                    return position;
                }
                position.line += index;
            }
        }
        if position.line == self.start_position.line {
            position.column += location;
        } else {
            let line_start = self.line_starts[position.line - self.start_position.line - 1];
            position.column = location - line_start;
        }
        position
    }
}

impl Filter for LineCountFilter {
    fn identify(&self) -> &'static str {
        "idaeim Line Count Filter"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply(&mut self, buffer: &mut [u8], start: usize, end: usize) {
        if !self.enabled {
            return;
        }
        let end = end.min(buffer.len());
        for index in start..end {
            if buffer[index] == b'\n' {
                self.line_starts.push(self.last_location + (index - start) + 1);
            }
        }
        self.last_location += end - start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_within_a_slide() {
        let mut filter = LineCountFilter::default();
        let mut buffer = b"one\ntwo\nthree".to_vec();
        let len = buffer.len();
        filter.apply(&mut buffer, 0, len);
        assert_eq!(filter.position_of(0), Position { line: 1, column: 0 });
        assert_eq!(filter.position_of(4), Position { line: 2, column: 0 });
        assert_eq!(filter.position_of(8), Position { line: 3, column: 0 });
        assert_eq!(filter.position_of(9), Position { line: 3, column: 1 });
    }

    #[test]
    fn position_unknown_past_the_end() {
        let mut filter = LineCountFilter::default();
        let mut buffer = b"abc\n".to_vec();
        let len = buffer.len();
        filter.apply(&mut buffer, 0, len);
        let position = filter.position_of(100);
        assert_eq!(position.column, NO_LIMIT);
    }
}
