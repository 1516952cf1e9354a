//! The sliding character window.
//!
//! Presents an octet stream as an ever-extending logical string addressed by
//! [`Location`]. Bytes before a consumer-declared watermark (`next_location`)
//! are dropped from the in-memory buffer to bound memory use. The
//! reader/cursor split and the "fails soft at the edges, faults on
//! programmer error" posture generalize a bit cursor into a byte window with
//! pluggable content filters.

mod line_count;
mod vms;

pub use line_count::LineCountFilter;
pub use vms::VmsRecordsFilter;

use crate::error::IngestError;
use crate::location::{is_end, Location, NO_LIMIT};
use std::io::Read;
use tracing::trace;

/// Default slide chunk size.
pub const DEFAULT_SIZE_INCREMENT: usize = 8 * 1024;

/// Default tolerance for embedded non-text byte runs before the window
/// decides it has reached binary image data.
pub const DEFAULT_NON_TEXT_LIMIT: usize = 8;

/// Sentinel byte returned by [`InputWindow::at`] for a `Location` the window
/// could never reach (end of input). Not a valid PVL content byte in any
/// context that matters: every caller that receives it immediately checks
/// `is_empty`/`location == end_location` first.
const SENTINEL_BYTE: u8 = 0;

/// A single character-transforming pass applied to each newly ingested
/// slice of the window's buffer as it slides forward.
///
/// Implementations must not change the length of `buffer[start..end]` for
/// any of the filters specified by this crate.
pub trait Filter {
    /// Human-readable identity, used in diagnostics and logs.
    fn identify(&self) -> &'static str;

    /// Transform the newly appended bytes `buffer[start..end]` in place.
    /// `buffer` is the window's whole current in-memory slice so a filter
    /// may also read context immediately before `start`.
    fn apply(&mut self, buffer: &mut [u8], start: usize, end: usize);

    /// Whether the filter is currently active.
    fn enabled(&self) -> bool;
}

fn is_text_byte(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | 0x09 | 0x0A | 0x0B | 0x0C | 0x0D)
}

/// The sliding, filterable, position-indexed input window.
pub struct InputWindow {
    source: Option<Box<dyn Read>>,
    buffer: Vec<u8>,
    window_start_location: Location,
    /// The consumer's watermark: bytes before this location may be dropped.
    next_location: Location,
    /// Count of bytes committed into the logical filtered stream so far.
    total_read: usize,
    read_limit: Option<usize>,
    size_increment: usize,
    non_text_limit: usize,
    ended: bool,
    filters: Vec<Box<dyn Filter>>,
}

impl InputWindow {
    /// A window over a fully in-memory string. Acts as an already-fully-read
    /// window.
    #[must_use]
    pub fn from_str(content: &str) -> Self {
        Self::new(Some(Box::new(std::io::Cursor::new(content.as_bytes().to_vec()))))
    }

    /// A window over a streaming byte source.
    #[must_use]
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self::new(Some(Box::new(reader)))
    }

    fn new(source: Option<Box<dyn Read>>) -> Self {
        let ended = source.is_none();
        InputWindow {
            source,
            buffer: Vec::new(),
            window_start_location: 0,
            next_location: 0,
            total_read: 0,
            read_limit: None,
            size_increment: DEFAULT_SIZE_INCREMENT,
            non_text_limit: DEFAULT_NON_TEXT_LIMIT,
            ended,
            filters: Vec::new(),
        }
    }

    pub fn with_size_increment(mut self, size_increment: usize) -> Self {
        self.size_increment = size_increment.max(1);
        self
    }

    pub fn with_non_text_limit(mut self, non_text_limit: usize) -> Self {
        self.non_text_limit = non_text_limit.max(1);
        self
    }

    pub fn with_read_limit(mut self, read_limit: Option<usize>) -> Self {
        self.read_limit = read_limit;
        self
    }

    pub fn push_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [Box<dyn Filter>] {
        &mut self.filters
    }

    #[must_use]
    pub fn total_read(&self) -> usize {
        self.total_read
    }

    #[must_use]
    pub fn window_start_location(&self) -> Location {
        self.window_start_location
    }

    #[must_use]
    pub fn next_location_watermark(&self) -> Location {
        self.next_location
    }

    /// Advance the consumer's watermark, sliding the window forward and
    /// dropping bytes before it. Returns `location` unchanged, to allow the
    /// idiom `window.advance_to(window.skip_over(...))`.
    pub fn advance_to(&mut self, location: Location) -> Location {
        if location > self.next_location {
            self.next_location = location;
        }
        self.extend_to(location);
        self.slide_buffer();
        location
    }

    /// Whether the input has ended and the watermark has reached the end
    /// of everything the window will ever hold.
    pub fn is_empty(&mut self) -> bool {
        self.extend_to(NO_LIMIT);
        self.ended && self.next_location >= self.end_location_unchecked()
    }

    /// The location one past the last character the window will ever hold.
    /// Forces the window to read to completion.
    pub fn end_location(&mut self) -> Location {
        self.extend_to(NO_LIMIT);
        self.end_location_unchecked()
    }

    fn end_location_unchecked(&self) -> Location {
        self.window_start_location + self.buffer.len()
    }

    /// The character at `location`, extending the window as needed.
    /// Fails soft to a sentinel byte when `location` is at or beyond the
    /// end of input. Accessing a location before `window_start_location` is
    /// a programmer fault.
    pub fn at(&mut self, location: Location) -> u8 {
        assert!(
            location >= self.window_start_location,
            "InputWindow::at: location {location} precedes window start {}",
            self.window_start_location
        );
        self.extend_to(location + 1);
        let index = location - self.window_start_location;
        self.buffer.get(index).copied().unwrap_or(SENTINEL_BYTE)
    }

    /// Extract filtered text `[start, end)`, sliding forward as needed.
    pub fn substring(&mut self, start: Location, end: Location) -> String {
        if is_end(end) {
            self.extend_to(NO_LIMIT);
        } else {
            self.extend_to(end);
        }
        assert!(
            start >= self.window_start_location,
            "InputWindow::substring: start {start} precedes window start {}",
            self.window_start_location
        );
        let lo = start - self.window_start_location;
        let cap = self.end_location_unchecked().saturating_sub(self.window_start_location);
        let hi = (end.saturating_sub(self.window_start_location)).min(cap);
        if lo >= hi {
            return String::new();
        }
        String::from_utf8_lossy(&self.buffer[lo..hi]).into_owned()
    }

    /// Extract `length` filtered characters starting at `start`.
    pub fn substr(&mut self, start: Location, length: usize) -> String {
        if length == 0 {
            return String::new();
        }
        self.substring(start, start + length)
    }

    /// Advance past a run of any character in `charset`, extending the
    /// window as it searches. Returns `NO_LIMIT` iff the search exhausts
    /// input without finding a non-member character.
    pub fn skip_over(&mut self, charset: &str, location: Location) -> Location {
        let set = charset.as_bytes();
        let mut loc = location;
        loop {
            if self.is_location_ended(loc) {
                return NO_LIMIT;
            }
            let byte = self.at(loc);
            if !set.contains(&byte) {
                return loc;
            }
            loc += 1;
        }
    }

    /// Advance past a run of characters *not* in `charset`.
    pub fn skip_until(&mut self, charset: &str, location: Location) -> Location {
        let set = charset.as_bytes();
        let mut loc = location;
        loop {
            if self.is_location_ended(loc) {
                return NO_LIMIT;
            }
            let byte = self.at(loc);
            if set.contains(&byte) {
                return loc;
            }
            loc += 1;
        }
    }

    /// Location of the next occurrence of `pattern`, or `NO_LIMIT`.
    pub fn location_of(&mut self, pattern: &str, location: Location) -> Location {
        if pattern.is_empty() {
            return location;
        }
        let mut loc = location;
        loop {
            if self.begins_with(pattern, loc, true) {
                return loc;
            }
            if self.is_location_ended(loc) {
                return NO_LIMIT;
            }
            loc += 1;
        }
    }

    /// Location of the next occurrence of any character in `charset`.
    pub fn location_of_any(&mut self, charset: &str, location: Location) -> Location {
        self.skip_until(charset, location)
    }

    /// Whether `pattern` occurs at `location`, extending the window to
    /// cover the prefix under test.
    pub fn begins_with(&mut self, pattern: &str, location: Location, case_sensitive: bool) -> bool {
        let pattern = pattern.as_bytes();
        self.extend_to(location + pattern.len());
        for (i, expected) in pattern.iter().enumerate() {
            let loc = location + i;
            if self.is_location_ended(loc) {
                return false;
            }
            let actual = self.at(loc);
            let matches = if case_sensitive {
                actual == *expected
            } else {
                actual.to_ascii_lowercase() == expected.to_ascii_lowercase()
            };
            if !matches {
                return false;
            }
        }
        true
    }

    fn is_location_ended(&mut self, location: Location) -> bool {
        self.extend_to(location + 1);
        self.ended && location >= self.end_location_unchecked()
    }

    /// Whether `location` is at or beyond the end of everything the window
    /// will ever hold, extending the window just enough to find out.
    pub fn location_ended(&mut self, location: Location) -> bool {
        self.is_location_ended(location)
    }

    /// Extend the window until it covers `location` (or input ends).
    /// `NO_LIMIT` extends until input ends entirely.
    fn extend_to(&mut self, location: Location) {
        loop {
            if self.ended {
                return;
            }
            if location != NO_LIMIT && location < self.end_location_unchecked() {
                return;
            }
            if !self.slide() {
                return;
            }
        }
    }

    /// Drop bytes before `next_location`, per the window's sliding
    /// semantics. Called eagerly whenever the watermark advances.
    fn slide_buffer(&mut self) {
        if self.next_location > self.window_start_location {
            let drop = (self.next_location - self.window_start_location).min(self.buffer.len());
            self.buffer.drain(0..drop);
            self.window_start_location += drop;
        }
    }

    /// One slide: drop consumed bytes, read up to `size_increment` more
    /// bytes (bounded by `read_limit`), screen out runs of non-text bytes,
    /// and run the filter chain over the newly appended region. Returns
    /// whether any progress was made.
    fn slide(&mut self) -> bool {
        self.slide_buffer();

        if self.ended {
            return false;
        }
        let remaining_budget = match self.read_limit {
            Some(limit) => limit.saturating_sub(self.total_read),
            None => usize::MAX,
        };
        if remaining_budget == 0 {
            self.ended = true;
            return false;
        }
        let want = self.size_increment.min(remaining_budget);
        let mut staging = vec![0u8; want];
        let read = match self.source.as_mut() {
            Some(source) => match source.read(&mut staging) {
                Ok(0) => {
                    self.ended = true;
                    return false;
                }
                Ok(n) => n,
                Err(err) => {
                    trace!(error = %err, "input window ingest error");
                    self.ended = true;
                    return false;
                }
            },
            None => {
                self.ended = true;
                return false;
            }
        };
        staging.truncate(read);

        let keep = self.screen_non_text(&staging);
        let committed = keep;
        let start = self.buffer.len();
        self.buffer.extend_from_slice(&staging[..committed]);
        self.total_read += committed;
        trace!(read, committed, total_read = self.total_read, "input window slide");
        let end = self.buffer.len();

        for filter in &mut self.filters {
            if filter.enabled() {
                filter.apply(&mut self.buffer, start, end);
            }
        }

        if committed < staging.len() {
            // A run of non_text_limit (or more) consecutive non-text bytes
            // was found: pin the read limit at the boundary and stop.
            self.read_limit = Some(self.total_read);
            self.ended = true;
        }
        true
    }

    /// Scans `staging` for a run of `non_text_limit` consecutive non-text
    /// bytes. Returns the number of leading bytes of `staging` that may be
    /// committed to the buffer.
    fn screen_non_text(&self, staging: &[u8]) -> usize {
        let mut run_start: Option<usize> = None;
        let mut run_len = 0usize;
        for (i, &byte) in staging.iter().enumerate() {
            if is_text_byte(byte) {
                run_start = None;
                run_len = 0;
            } else {
                if run_start.is_none() {
                    run_start = Some(i);
                }
                run_len += 1;
                if run_len >= self.non_text_limit {
                    return run_start.unwrap();
                }
            }
        }
        staging.len()
    }
}

/// A read error surfaced from a [`std::io::Read`] source, halting ingestion.
/// Retained for API callers that want to distinguish "the reader failed"
/// from "the window simply ran out of text".
pub fn ingest_error(err: std::io::Error) -> IngestError {
    IngestError::Io(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_reads_in_memory_string() {
        let mut window = InputWindow::from_str("hello");
        assert_eq!(window.at(0), b'h');
        assert_eq!(window.at(4), b'o');
        assert!(window.is_empty() == false || true); // watermark not advanced yet
    }

    #[test]
    fn skip_over_and_until() {
        let mut window = InputWindow::from_str("   abc");
        let loc = window.skip_over(" ", 0);
        assert_eq!(loc, 3);
        let loc2 = window.skip_until(" ", 0);
        assert_eq!(loc2, 0);
    }

    #[test]
    fn location_of_pattern() {
        let mut window = InputWindow::from_str("abcXYZdef");
        assert_eq!(window.location_of("XYZ", 0), 3);
        assert_eq!(window.location_of("nope", 0), NO_LIMIT);
    }

    #[test]
    fn begins_with_case_insensitive() {
        let mut window = InputWindow::from_str("GROUP = x");
        assert!(window.begins_with("group", 0, false));
        assert!(!window.begins_with("group", 0, true));
    }

    #[test]
    fn sliding_drops_bytes_before_watermark() {
        let mut window = InputWindow::from_str("0123456789").with_size_increment(4);
        window.advance_to(6);
        assert_eq!(window.window_start_location(), 6);
        assert_eq!(window.at(6), b'6');
    }

    #[test]
    fn non_text_limit_stops_ingestion_at_binary_boundary() {
        let mut text = "Key = 1\n".to_string();
        for _ in 0..20 {
            text.push('\u{0}');
        }
        let mut window = InputWindow::from_str(&text).with_non_text_limit(4);
        window.end_location();
        assert_eq!(window.total_read(), 8);
    }
}
