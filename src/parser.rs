//! The recursive-descent PVL parser: a single-pass scanner driving an
//! [`InputWindow`] into a parameter tree, accumulating diagnostics as it
//! goes (or raising the first one as a hard error in strict mode).

use crate::error::{Diagnostic, DiagnosticKind, ParseError};
use crate::location::{is_end, Location, Position};
use crate::parameter::{Aggregate, AggregateKind, Assignment, Parameter};
use crate::value::{RealFormat, StringKind, StringValue, Value, ValueKind};
use crate::window::{Filter, InputWindow, LineCountFilter, VmsRecordsFilter};
use bitflags::bitflags;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{trace, warn};

const WHITESPACE: &str = " \t\r\n\x0c\x0b";
const LINE_DELIMITERS: &str = "\r\n\x0c\x0b";
const RESERVED_CHARS: &str = "{}()[]<>&\"',=;#%~|+!";
const NAME_DELIMITERS: &str = " \t\r\n\x0c\x0b=;";
const VALUE_DELIMITERS: &str = " \t\r\n\x0c\x0b,{}()<>;";

fn is_reserved(byte: u8) -> bool {
    RESERVED_CHARS.as_bytes().contains(&byte) || WHITESPACE.as_bytes().contains(&byte)
}

bitflags! {
    /// Parser configuration flags ("modes" in the PVL grammar).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParserOptions: u8 {
        /// Convert warnings to errors (abort parse).
        const STRICT = 1 << 0;
        /// Keep escape sequences literal; do not fold line-wraps.
        const VERBATIM_STRINGS = 1 << 1;
        /// Treat `#` at a logical line start as a line comment.
        const COMMENTED_LINES = 1 << 2;
        /// In quoted strings, a trailing `-` before newline joins with no space.
        const STRING_CONTINUATION = 1 << 3;
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions::COMMENTED_LINES | ParserOptions::STRING_CONTINUATION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    End,
    EndGroup,
    EndObject,
}

enum Classified {
    Aggregate(AggregateKind),
    Terminator(Terminator),
    Assignment,
}

fn classify_name(name: &str) -> Classified {
    match name.to_ascii_uppercase().as_str() {
        "BEGIN_GROUP" | "BEGINGROUP" | "GROUP" => Classified::Aggregate(AggregateKind::Group),
        "BEGIN_OBJECT" | "BEGINOBJECT" | "OBJECT" => Classified::Aggregate(AggregateKind::Object),
        "END_GROUP" | "ENDGROUP" => Classified::Terminator(Terminator::EndGroup),
        "END_OBJECT" | "ENDOBJECT" => Classified::Terminator(Terminator::EndObject),
        "END" => Classified::Terminator(Terminator::End),
        _ => Classified::Assignment,
    }
}

enum ParsedStatement {
    Parameter(Parameter),
    Terminator(Terminator),
    EndOfInput,
}

/// A [`crate::window::Filter`] that delegates to a shared, externally
/// queryable [`LineCountFilter`] so the parser can both install it in the
/// window's filter chain and ask it for `(line, column)` positions.
struct SharedLineCount(Rc<RefCell<LineCountFilter>>);

impl Filter for SharedLineCount {
    fn identify(&self) -> &'static str {
        "idaeim Line Count Filter"
    }

    fn apply(&mut self, buffer: &mut [u8], start: usize, end: usize) {
        self.0.borrow_mut().apply(buffer, start, end);
    }

    fn enabled(&self) -> bool {
        self.0.borrow().enabled()
    }
}

/// Drives an [`InputWindow`] to build a parameter tree, accumulating
/// diagnostics (or, in strict mode, aborting on the first one).
pub struct Parser {
    window: InputWindow,
    options: ParserOptions,
    location: Location,
    line_count: Rc<RefCell<LineCountFilter>>,
    diagnostics: Vec<Diagnostic>,
    /// Text of block comments seen since the last attached parameter,
    /// awaiting attachment to whichever parameter comes next.
    pending_comment: Option<String>,
}

impl Parser {
    /// Installs the VMS record-unframing filter ahead of line counting, so
    /// line/column positions are reported against the unframed text. The
    /// filter auto-detects: it disables itself on its first `apply` call if
    /// the leading bytes don't look like a plausible record-size word.
    #[must_use]
    pub fn new(mut window: InputWindow, options: ParserOptions) -> Self {
        window.push_filter(Box::new(VmsRecordsFilter::new()));
        let line_count = Rc::new(RefCell::new(LineCountFilter::default()));
        window.push_filter(Box::new(SharedLineCount(line_count.clone())));
        Parser {
            window,
            options,
            location: 0,
            line_count,
            diagnostics: Vec::new(),
            pending_comment: None,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Parses the whole input. The result is wrapped in a synthetic root
    /// only when the input yielded more than one top-level parameter; an
    /// empty input yields `None`.
    pub fn parse(&mut self) -> Result<Option<Parameter>, ParseError> {
        let mut root = Aggregate::root();
        self.parse_parameters(&mut root, None)?;
        Ok(match root.len() {
            0 => None,
            1 => Some(root.remove(0)),
            _ => Some(Parameter::Aggregate(root)),
        })
    }

    fn position_at(&self, location: Location) -> Option<Position> {
        Some(self.line_count.borrow().position_of(location))
    }

    fn diagnose(
        &mut self,
        kind: DiagnosticKind,
        location: Location,
        message: impl Into<String>,
    ) -> Result<(), ParseError> {
        let diagnostic = Diagnostic::new(kind, location, self.position_at(location), message.into());
        warn!(kind = %diagnostic.kind, location, "{}", diagnostic.message);
        if self.options.contains(ParserOptions::STRICT) {
            return Err(diagnostic.into());
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    fn clamp_end(&mut self, location: Location) -> Location {
        if is_end(location) {
            self.window.end_location()
        } else {
            location
        }
    }

    fn parse_parameters(
        &mut self,
        container: &mut Aggregate,
        expected: Option<AggregateKind>,
    ) -> Result<Terminator, ParseError> {
        loop {
            match self.parse_statement()? {
                ParsedStatement::EndOfInput => return Ok(Terminator::End),
                ParsedStatement::Terminator(term) => {
                    self.check_terminator(expected, term)?;
                    return Ok(term);
                }
                ParsedStatement::Parameter(Parameter::Aggregate(mut nested)) => {
                    let nested_kind = nested.kind;
                    self.parse_parameters(&mut nested, Some(nested_kind))?;
                    container.append(Parameter::Aggregate(nested));
                }
                ParsedStatement::Parameter(parameter) => {
                    container.append(parameter);
                }
            }
            self.window.advance_to(self.location);
        }
    }

    fn check_terminator(
        &mut self,
        expected: Option<AggregateKind>,
        term: Terminator,
    ) -> Result<(), ParseError> {
        // A bare `END` never mismatches, at any nesting level. And the root
        // container (`expected == None`) has no parent to mismatch against,
        // so a stray `END_GROUP`/`END_OBJECT` at the top level is likewise
        // not a closure mismatch.
        if term == Terminator::End || expected.is_none() {
            return Ok(());
        }
        let matches = matches!(
            (expected, term),
            (Some(AggregateKind::Group), Terminator::EndGroup)
                | (Some(AggregateKind::Object), Terminator::EndObject)
        );
        if !matches {
            self.diagnose(
                DiagnosticKind::AggregateClosureMismatch,
                self.location,
                "aggregate terminator does not match its opener",
            )?;
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<ParsedStatement, ParseError> {
        self.skip_leading()?;
        if self.window.location_ended(self.location) {
            return Ok(ParsedStatement::EndOfInput);
        }
        let name = self.parse_name()?;
        if name.is_empty() {
            return Ok(ParsedStatement::EndOfInput);
        }
        match classify_name(&name) {
            Classified::Terminator(term) => {
                // A terminator closes an aggregate rather than carrying a
                // parameter of its own; any comment accumulated just before
                // it has nothing to attach to.
                self.pending_comment = None;
                self.skip_trailing()?;
                Ok(ParsedStatement::Terminator(term))
            }
            Classified::Aggregate(kind) => {
                let comment = self.pending_comment.take();
                self.skip_trivia(false)?;
                let mut aggregate_name = name.clone();
                if self.window.at(self.location) == b'=' {
                    self.location += 1;
                    self.skip_trivia(false)?;
                    let value = self.parse_value()?;
                    match value.kind {
                        ValueKind::String(s) => aggregate_name = s.text,
                        _ => {
                            self.diagnose(
                                DiagnosticKind::InvalidAggregateValue,
                                self.location,
                                "aggregate name value must be a string",
                            )?;
                        }
                    }
                }
                self.skip_trailing()?;
                let mut aggregate = Aggregate::new(kind, aggregate_name);
                aggregate.comment = comment;
                Ok(ParsedStatement::Parameter(Parameter::Aggregate(aggregate)))
            }
            Classified::Assignment => {
                let comment = self.pending_comment.take();
                self.skip_trivia(false)?;
                let value = if self.window.at(self.location) == b'=' {
                    self.location += 1;
                    self.skip_trivia(false)?;
                    self.parse_value()?
                } else {
                    Value::default_value()
                };
                self.skip_trailing()?;
                let mut assignment = Assignment::new(name, value);
                assignment.comment = comment;
                Ok(ParsedStatement::Parameter(Parameter::Assignment(assignment)))
            }
        }
    }

    fn skip_leading(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_trivia(true)?;
            if self.window.at(self.location) == b';' {
                self.location += 1;
                continue;
            }
            break;
        }
        Ok(())
    }

    fn skip_trailing(&mut self) -> Result<(), ParseError> {
        self.skip_trivia(false)?;
        if self.window.at(self.location) == b';' {
            self.location += 1;
        }
        Ok(())
    }

    /// Skips whitespace, block comments, and (non-strict) `#` line comments.
    /// When `accumulate` is set, block comment text is collected into
    /// `pending_comment` for attachment to the next parameter; this is only
    /// set for the leading-trivia scan, so a trailing or mid-value comment
    /// is simply discarded, matching "leading block comments" only.
    fn skip_trivia(&mut self, accumulate: bool) -> Result<(), ParseError> {
        loop {
            let before = self.location;
            self.location = self.clamp_end(self.window.skip_over(WHITESPACE, self.location));
            if self.window.begins_with("/*", self.location, true) {
                self.skip_comment(accumulate)?;
                continue;
            }
            if self.options.contains(ParserOptions::COMMENTED_LINES)
                && !self.options.contains(ParserOptions::STRICT)
                && self.window.at(self.location) == b'#'
            {
                self.location = self.clamp_end(self.window.skip_until(LINE_DELIMITERS, self.location));
                continue;
            }
            if self.location == before {
                break;
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self, accumulate: bool) -> Result<(), ParseError> {
        let comment_start = self.location;
        self.location += 2;
        let close = self.window.location_of("*/", self.location);
        let text_end = self.clamp_end(close);
        let text = self.window.substring(self.location, text_end);
        if !self.options.contains(ParserOptions::VERBATIM_STRINGS)
            && text.bytes().any(|b| LINE_DELIMITERS.as_bytes().contains(&b))
        {
            self.diagnose(
                DiagnosticKind::MultilineComment,
                comment_start,
                "comment spans multiple lines",
            )?;
        }
        if is_end(close) {
            self.diagnose(
                DiagnosticKind::MissingCommentEnd,
                comment_start,
                "comment has no closing */",
            )?;
            self.location = self.window.end_location();
        } else {
            self.location = close + 2;
        }
        if accumulate {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                match &mut self.pending_comment {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(trimmed);
                    }
                    None => self.pending_comment = Some(trimmed.to_string()),
                }
            }
        }
        Ok(())
    }

    fn parse_name(&mut self) -> Result<String, ParseError> {
        let byte = self.window.at(self.location);
        let raw = if byte == b'"' || byte == b'\'' {
            self.diagnose(
                DiagnosticKind::InvalidSyntax,
                self.location,
                "parameter name is quoted",
            )?;
            self.parse_quoted_string()?.text
        } else {
            let start = self.location;
            let mut end = self.clamp_end(self.window.skip_until(NAME_DELIMITERS, start));
            let raw_full = self.window.substring(start, end);
            if let Some(idx) = raw_full.find("/*") {
                end = start + idx;
            }
            let raw = self.window.substring(start, end);
            for (index, byte) in raw.bytes().enumerate() {
                if is_reserved(byte) {
                    self.diagnose(
                        DiagnosticKind::ReservedCharacter,
                        start + index,
                        format!("reserved character {:?} in name", byte as char),
                    )?;
                }
            }
            self.location = end;
            raw
        };
        Ok(if self.options.contains(ParserOptions::VERBATIM_STRINGS) {
            raw
        } else {
            translate_escapes(&raw)
        })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_trivia(false)?;
        let byte = self.window.at(self.location);
        let mut value = if byte == b'{' || byte == b'(' {
            self.parse_array()?
        } else {
            self.parse_datum()?
        };
        self.skip_trivia(false)?;
        if self.window.at(self.location) == b'<' {
            value.units = Some(self.parse_units()?);
        }
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        use crate::value::ArrayKind;

        let open = self.window.at(self.location);
        let (kind, close) = if open == b'{' {
            (ArrayKind::Set, b'}')
        } else {
            (ArrayKind::Sequence, b')')
        };
        self.location += 1;
        let mut items = Vec::new();
        self.skip_trivia(false)?;
        let first = self.window.at(self.location);
        if first != b'}' && first != b')' && !self.window.location_ended(self.location) {
            loop {
                items.push(self.parse_value()?);
                self.skip_trivia(false)?;
                if self.window.at(self.location) == b',' {
                    self.location += 1;
                    self.skip_trivia(false)?;
                    continue;
                }
                break;
            }
        }
        let actual_close = self.window.at(self.location);
        if actual_close == close {
            self.location += 1;
        } else if actual_close == b'}' || actual_close == b')' {
            self.diagnose(
                DiagnosticKind::ArrayClosureMismatch,
                self.location,
                "array closing bracket does not match its opener",
            )?;
            self.location += 1;
        } else {
            self.diagnose(
                DiagnosticKind::ArrayClosureMismatch,
                self.location,
                "array is missing its closing bracket",
            )?;
        }
        Ok(Value::array(kind, items))
    }

    fn parse_datum(&mut self) -> Result<Value, ParseError> {
        let byte = self.window.at(self.location);
        match byte {
            b'"' | b'\'' => {
                let s = self.parse_quoted_string()?;
                Ok(Value::new(ValueKind::String(s)))
            }
            b'=' | b',' | b'{' | b'}' | b'(' | b')' | b'<' | b'>' | b'#' => {
                self.diagnose(DiagnosticKind::InvalidSyntax, self.location, "value expected")?;
                self.location += 1;
                Ok(Value::default_value())
            }
            _ => {
                let start = self.location;
                let end = self.clamp_end(self.window.skip_until(VALUE_DELIMITERS, start));
                self.location = end;
                let raw = self.window.substring(start, end);
                let token = if self.options.contains(ParserOptions::VERBATIM_STRINGS) {
                    raw
                } else {
                    translate_escapes(&raw)
                };
                self.classify_token(&token, start)
            }
        }
    }

    fn classify_token(&mut self, token: &str, start: Location) -> Result<Value, ParseError> {
        if token.is_empty() {
            self.diagnose(DiagnosticKind::InvalidSyntax, start, "empty value token")?;
            return Ok(Value::default_value());
        }
        if let Some(value) = parse_based_integer(token) {
            return Ok(value);
        }
        if let Some(value) = self.parse_plain_integer(token, start)? {
            return Ok(value);
        }
        if let Some(value) = parse_real(token) {
            return Ok(value);
        }
        let kind = if token.contains('-') || token.contains(':') {
            StringKind::DateTime
        } else {
            StringKind::Identifier
        };
        for (index, byte) in token.bytes().enumerate() {
            if is_reserved(byte) && byte != b'-' && byte != b':' {
                self.diagnose(
                    DiagnosticKind::ReservedCharacter,
                    start + index,
                    format!("reserved character {:?} in bareword", byte as char),
                )?;
            }
        }
        Ok(Value::string(token, kind))
    }

    fn parse_plain_integer(&mut self, token: &str, start: Location) -> Result<Option<Value>, ParseError> {
        let (sign, rest) = match token.as_bytes().first() {
            Some(b'+') => (1i128, &token[1..]),
            Some(b'-') => (-1i128, &token[1..]),
            _ => (1i128, token),
        };
        let (digits, radix) = if !self.options.contains(ParserOptions::STRICT)
            && (rest.starts_with("0x") || rest.starts_with("0X"))
        {
            (&rest[2..], 16u32)
        } else {
            (rest, 10u32)
        };
        if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
            return Ok(None);
        }
        match i128::from_str_radix(digits, radix) {
            Ok(value) => {
                let signed = sign * value;
                if radix == 10 {
                    Ok(Some(Value::integer(signed)))
                } else {
                    Ok(Some(Value::integer_based(signed, radix, digits.len() as u32)))
                }
            }
            Err(_) => {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::InvalidValue,
                    start,
                    self.position_at(start),
                    format!("integer literal {token:?} overflows"),
                );
                Err(diagnostic.into())
            }
        }
    }

    fn parse_quoted_string(&mut self) -> Result<StringValue, ParseError> {
        let quote_location = self.location;
        let quote = self.window.at(self.location);
        let kind = if quote == b'\'' {
            StringKind::Symbol
        } else {
            StringKind::Text
        };
        self.location += 1;
        let content_start = self.location;
        let mut loc = content_start;
        let mut closed = false;
        loop {
            if self.window.location_ended(loc) {
                break;
            }
            let byte = self.window.at(loc);
            if byte == quote {
                let prev = if loc > content_start {
                    self.window.at(loc - 1)
                } else {
                    0
                };
                if prev == b'\\' {
                    loc += 1;
                    continue;
                }
                closed = true;
                break;
            }
            loc += 1;
        }
        let raw = self.window.substring(content_start, loc);
        if closed {
            self.location = loc + 1;
        } else {
            self.diagnose(
                DiagnosticKind::MissingQuoteEnd,
                quote_location,
                "quoted string has no closing quote",
            )?;
            self.location = self.window.end_location();
        }
        let text = if self.options.contains(ParserOptions::VERBATIM_STRINGS) {
            raw
        } else {
            let folded = fold_line_wraps(&raw, self.options.contains(ParserOptions::STRING_CONTINUATION));
            translate_escapes(&folded)
        };
        Ok(StringValue { text, kind })
    }

    fn parse_units(&mut self) -> Result<String, ParseError> {
        let start_loc = self.location;
        self.location += 1;
        if self.options.contains(ParserOptions::VERBATIM_STRINGS) {
            let start = self.location;
            let close = self.window.location_of(">", start);
            let end = self.clamp_end(close);
            let text = self.window.substring(start, end);
            if is_end(close) {
                self.diagnose(
                    DiagnosticKind::MissingUnitsEnd,
                    start_loc,
                    "units string has no closing '>'",
                )?;
                self.location = end;
            } else {
                self.location = end + 1;
            }
            return Ok(text);
        }

        let mut text = String::new();
        loop {
            if self.window.location_ended(self.location) {
                self.diagnose(
                    DiagnosticKind::MissingUnitsEnd,
                    start_loc,
                    "units string has no closing '>'",
                )?;
                self.location = self.window.end_location();
                break;
            }
            let byte = self.window.at(self.location);
            if byte == b'>' {
                self.location += 1;
                break;
            }
            if self.window.begins_with("/*", self.location, true) {
                self.skip_comment(false)?;
                if !text.ends_with(' ') {
                    text.push(' ');
                }
                continue;
            }
            if WHITESPACE.as_bytes().contains(&byte) {
                self.location = self.clamp_end(self.window.skip_over(WHITESPACE, self.location));
                if !text.ends_with(' ') {
                    text.push(' ');
                }
                continue;
            }
            text.push(byte as char);
            self.location += 1;
        }
        Ok(text.trim().to_string())
    }
}

/// Runs a [`Parser`] to completion, returning both the parse result and the
/// accumulated diagnostics (empty, or truncated to one, under strict mode).
pub fn parse(
    window: InputWindow,
    options: ParserOptions,
) -> (Result<Option<Parameter>, ParseError>, Vec<Diagnostic>) {
    let mut parser = Parser::new(window, options);
    let result = parser.parse();
    trace!(diagnostics = parser.diagnostics.len(), "parse complete");
    (result, parser.diagnostics)
}

/// Convenience entry point over an in-memory string: the window acts as an
/// already fully-read source.
pub fn parse_str(
    content: &str,
    options: ParserOptions,
) -> (Result<Option<Parameter>, ParseError>, Vec<Diagnostic>) {
    parse(InputWindow::from_str(content), options)
}

fn parse_based_integer(token: &str) -> Option<Value> {
    let (sign, rest) = match token.as_bytes().first() {
        Some(b'+') => (1i128, &token[1..]),
        Some(b'-') => (-1i128, &token[1..]),
        _ => (1i128, token),
    };
    let mut parts = rest.splitn(3, '#');
    let base_str = parts.next()?;
    let digits = parts.next()?;
    let trailing = parts.next()?;
    if !trailing.is_empty() {
        return None;
    }
    let base: u32 = base_str.parse().ok()?;
    if !(2..=16).contains(&base) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(base)) {
        return None;
    }
    let value = i128::from_str_radix(digits, base).ok()?;
    Some(Value::integer_based(sign * value, base, digits.len() as u32))
}

fn parse_real(token: &str) -> Option<Value> {
    if !token.bytes().any(|b| b == b'.' || b == b'e' || b == b'E') {
        return None;
    }
    let lower = token.to_ascii_lowercase();
    let scientific = lower.contains('e');
    let value: f64 = token.parse().ok()?;
    let precision = if scientific {
        lower
            .rsplit('e')
            .next()
            .unwrap_or("")
            .chars()
            .filter(char::is_ascii_digit)
            .count() as u32
    } else {
        token
            .rsplit_once('.')
            .map(|(_, frac)| frac.len() as u32)
            .unwrap_or(0)
    };
    let format = if scientific {
        RealFormat::Scientific
    } else {
        RealFormat::Fixed
    };
    Some(Value::real(value, precision, format))
}

fn translate_escapes(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            match next {
                b't' => {
                    out.push('\t');
                    i += 2;
                }
                b'n' => {
                    out.push('\n');
                    i += 2;
                }
                b'r' => {
                    out.push('\r');
                    i += 2;
                }
                b'b' => {
                    out.push('\u{8}');
                    i += 2;
                }
                b'f' => {
                    out.push('\u{c}');
                    i += 2;
                }
                b'\\' => {
                    out.push('\\');
                    i += 2;
                }
                b'"' => {
                    out.push('"');
                    i += 2;
                }
                b'\'' => {
                    out.push('\'');
                    i += 2;
                }
                b'0'..=b'7' => {
                    let mut j = i + 1;
                    let mut value: u32 = 0;
                    let mut digits = 0;
                    while j < bytes.len() && digits < 3 && (b'0'..=b'7').contains(&bytes[j]) {
                        value = value * 8 + (bytes[j] - b'0') as u32;
                        j += 1;
                        digits += 1;
                    }
                    if value <= 255 {
                        out.push(value as u8 as char);
                    }
                    i = j;
                }
                _ => {
                    out.push('\\');
                    i += 1;
                }
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

/// Line-wrap folding for quoted strings, preserving `\v`-fenced verbatim
/// regions.
fn fold_line_wraps(raw: &str, string_continuation: bool) -> String {
    let mut segments: Vec<(bool, String)> = Vec::new();
    let mut verbatim = false;
    let mut current = String::new();
    for ch in raw.chars() {
        if ch == '\u{b}' {
            segments.push((verbatim, std::mem::take(&mut current)));
            verbatim = !verbatim;
            continue;
        }
        current.push(ch);
    }
    segments.push((verbatim, current));

    let mut out = String::new();
    for (is_verbatim, segment) in segments {
        if is_verbatim {
            out.push_str(&segment);
        } else {
            out.push_str(&fold_segment(&segment, string_continuation));
        }
    }
    out
}

fn fold_segment(segment: &str, string_continuation: bool) -> String {
    let lines: Vec<&str> = segment.split(['\r', '\n', '\u{c}']).collect();
    let mut out = String::new();
    for (index, line) in lines.iter().enumerate() {
        if index == 0 {
            out.push_str(line.trim_end_matches([' ', '\t']));
            continue;
        }
        let trimmed_len = out.trim_end_matches([' ', '\t']).len();
        out.truncate(trimmed_len);
        let bytes = out.as_bytes();
        let isolated_hyphen =
            bytes.len() >= 2 && bytes[bytes.len() - 1] == b'-' && bytes[bytes.len() - 2] == b' ';
        let continuation = string_continuation && out.ends_with('-') && !isolated_hyphen;
        let next = line.trim_start_matches([' ', '\t']);
        if continuation {
            // Hyphenated line continuation: the hyphen itself is the join
            // point and is dropped, no space inserted.
            out.pop();
            out.push_str(next);
        } else {
            out.push(' ');
            out.push_str(next.trim_end_matches([' ', '\t']));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn assignment_value(parameter: &Parameter, name: &str) -> &Value {
        let aggregate = parameter.as_aggregate().expect("expected aggregate");
        aggregate
            .children()
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .and_then(Parameter::as_assignment)
            .map(|a| &a.value)
            .unwrap_or_else(|| panic!("missing assignment {name}"))
    }

    #[test]
    fn parses_simple_assignment() {
        let (result, diagnostics) = parse_str("LINES = 100\nEND", ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let assignment = parameter.as_assignment().unwrap();
        assert_eq!(assignment.name, "LINES");
        assert_eq!(assignment.value.as_i128(), Some(100));
    }

    #[test]
    fn parses_group_with_nested_assignments() {
        let text = "GROUP = IMAGE\n  LINES = 10\n  LINE_SAMPLES = 20\nEND_GROUP = IMAGE\nEND";
        let (result, diagnostics) = parse_str(text, ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let aggregate = parameter.as_aggregate().unwrap();
        assert_eq!(aggregate.name, "IMAGE");
        assert_eq!(aggregate.kind, AggregateKind::Group);
        assert_eq!(assignment_value(&parameter, "LINES").as_i128(), Some(10));
    }

    #[test]
    fn parses_based_integer_and_units() {
        let (result, diagnostics) = parse_str("VALUE = 16#FF# <m>\nEND", ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let assignment = parameter.as_assignment().unwrap();
        assert_eq!(assignment.value.as_i128(), Some(255));
        assert_eq!(assignment.value.units.as_deref(), Some("m"));
        match &assignment.value.kind {
            ValueKind::Integer(i) => assert_eq!(i.base, 16),
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn parses_hex_literal_tagged_with_base_and_digits() {
        let (result, diagnostics) = parse_str("VALUE = 0x2A\nEND", ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let assignment = parameter.as_assignment().unwrap();
        assert_eq!(assignment.value.as_i128(), Some(42));
        match &assignment.value.kind {
            ValueKind::Integer(i) => {
                assert_eq!(i.base, 16);
                assert_eq!(i.digits, 2);
            }
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn leading_block_comment_attaches_to_the_next_parameter() {
        let text = "/* image rows */\nLINES = 100\nEND";
        let (result, diagnostics) = parse_str(text, ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        assert_eq!(parameter.comment(), Some("image rows"));
    }

    #[test]
    fn trailing_comment_is_not_attached() {
        let text = "LINES = 100 /* not attached */\nEND";
        let (result, diagnostics) = parse_str(text, ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        assert_eq!(parameter.comment(), None);
    }

    #[test]
    fn parses_sequence_array() {
        let (result, diagnostics) = parse_str("A = (1, 2, 3)\nEND", ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let assignment = parameter.as_assignment().unwrap();
        match &assignment.value.kind {
            ValueKind::Array(array) => assert_eq!(array.items.len(), 3),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn hyphen_continuation_joins_quoted_lines() {
        let text = "A = \"abc-\ndef\"\nEND";
        let (result, diagnostics) = parse_str(text, ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        let assignment = parameter.as_assignment().unwrap();
        assert_eq!(assignment.value.as_str(), Some("abcdef"));
    }

    #[test]
    fn strict_mode_aborts_on_first_diagnostic() {
        let (result, _) = parse_str("A = ( 1, 2 ]\nEND", ParserOptions::STRICT);
        assert!(matches!(result, Err(ParseError::Strict(_))));
    }

    #[test]
    fn hash_comment_is_lenient_but_reserved_under_strict() {
        let text = "# a comment\nA = 1";
        let (result, diagnostics) = parse_str(text, ParserOptions::default());
        assert!(diagnostics.is_empty());
        let parameter = result.unwrap().unwrap();
        assert_eq!(parameter.as_assignment().unwrap().value.as_i128(), Some(1));

        let (strict_result, _) = parse_str(text, ParserOptions::STRICT);
        match strict_result {
            Err(ParseError::Strict(diagnostic)) => {
                assert_eq!(diagnostic.kind, DiagnosticKind::ReservedCharacter);
            }
            other => panic!("expected a reserved-character strict error, got {other:?}"),
        }
    }

    #[test]
    fn reserved_character_in_name_is_a_warning() {
        let (result, diagnostics) = parse_str("BAD,NAME = 1\nEND", ParserOptions::default());
        assert!(result.unwrap().is_some());
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ReservedCharacter));
    }
}
