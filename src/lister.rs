//! Canonical textual emission of a parameter tree.
//!
//! Re-quotes strings by their recorded `StringKind`, re-bases integers by
//! their recorded base and digit width, and re-attaches units and leading
//! comments, so that parsing and listing a label round-trips.

use crate::parameter::{Aggregate, AggregateKind, Parameter};
use crate::value::{ArrayKind, ArrayValue, RealFormat, RealValue, StringKind, StringValue, Value, ValueKind};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Lister configuration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ListerOptions: u8 {
        /// Emit `BEGIN_GROUP`/`END_GROUP`/`BEGIN_OBJECT`/`END_OBJECT`.
        const STRICT = 1 << 0;
        /// Align all `=` within an Aggregate to the widest name.
        const ALIGN_ASSIGNMENTS = 1 << 1;
        /// Indent array continuation lines.
        const INDENT_ARRAYS = 1 << 2;
        /// Prefer `/* ... */` on one line.
        const SINGLE_LINE_COMMENTS = 1 << 3;
        /// Emit `;` after each statement.
        const STATEMENT_ENDS = 1 << 4;
    }
}

impl Default for ListerOptions {
    fn default() -> Self {
        ListerOptions::ALIGN_ASSIGNMENTS | ListerOptions::INDENT_ARRAYS | ListerOptions::SINGLE_LINE_COMMENTS
    }
}

const INDENT_UNIT: &str = "    ";

/// Lists a single parameter (and, recursively, its children).
#[must_use]
pub fn list(parameter: &Parameter, options: ListerOptions) -> String {
    let mut out = String::new();
    write_parameter(&mut out, parameter, 0, &options).expect("String writes are infallible");
    out
}

/// Lists every child of a root container, terminated by a bare `END` line.
#[must_use]
pub fn list_root(root: &Aggregate, options: ListerOptions) -> String {
    let mut out = String::new();
    write_children(&mut out, root, 0, &options).expect("String writes are infallible");
    out.push_str("END\n");
    out
}

fn keywords(kind: AggregateKind, options: &ListerOptions) -> (&'static str, &'static str) {
    let strict = options.contains(ListerOptions::STRICT);
    match kind {
        AggregateKind::Group => {
            if strict {
                ("BEGIN_GROUP", "END_GROUP")
            } else {
                ("GROUP", "END_GROUP")
            }
        }
        AggregateKind::Object => {
            if strict {
                ("BEGIN_OBJECT", "END_OBJECT")
            } else {
                ("OBJECT", "END_OBJECT")
            }
        }
        AggregateKind::Container => ("", "END"),
    }
}

pub(crate) fn write_parameter(
    out: &mut impl fmt::Write,
    parameter: &Parameter,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    if let Some(comment) = parameter.comment() {
        write_comment(out, comment, indent, options)?;
    }
    let pad = INDENT_UNIT.repeat(indent);
    match parameter {
        Parameter::Assignment(a) => {
            write!(out, "{pad}{}", a.name)?;
            write!(out, " = ")?;
            write_value(out, &a.value, indent, options)
        }
        Parameter::Aggregate(agg) => {
            let (open_kw, close_kw) = keywords(agg.kind, options);
            writeln!(out, "{pad}{open_kw} = {}", agg.name)?;
            write_children(out, agg, indent + 1, options)?;
            write!(out, "{pad}{close_kw} = {}", agg.name)
        }
    }
}

/// Writes a parameter's attached comment on its own line(s), above the
/// parameter itself. `SINGLE_LINE_COMMENTS` collapses embedded newlines
/// into a single `/* ... */` line; otherwise each source line keeps its own
/// line inside the comment block.
fn write_comment(
    out: &mut impl fmt::Write,
    comment: &str,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    let pad = INDENT_UNIT.repeat(indent);
    if options.contains(ListerOptions::SINGLE_LINE_COMMENTS) {
        let flattened = comment.split_whitespace().collect::<Vec<_>>().join(" ");
        writeln!(out, "{pad}/* {flattened} */")
    } else {
        writeln!(out, "{pad}/*")?;
        for line in comment.lines() {
            writeln!(out, "{pad}{line}")?;
        }
        writeln!(out, "{pad}*/")
    }
}

fn write_children(
    out: &mut impl fmt::Write,
    aggregate: &Aggregate,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    let width = if options.contains(ListerOptions::ALIGN_ASSIGNMENTS) {
        aggregate
            .children()
            .iter()
            .filter_map(Parameter::as_assignment)
            .map(|a| a.name.len())
            .max()
            .unwrap_or(0)
    } else {
        0
    };
    let pad = INDENT_UNIT.repeat(indent);
    for child in aggregate.children() {
        match child {
            Parameter::Assignment(a) => {
                if let Some(comment) = &a.comment {
                    write_comment(out, comment, indent, options)?;
                }
                write!(out, "{pad}{:<width$}", a.name, width = width)?;
                write!(out, " = ")?;
                write_value(out, &a.value, indent, options)?;
            }
            Parameter::Aggregate(_) => {
                write_parameter(out, child, indent, options)?;
            }
        }
        if options.contains(ListerOptions::STATEMENT_ENDS) {
            write!(out, ";")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub(crate) fn write_value(
    out: &mut impl fmt::Write,
    value: &Value,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    write_value_kind(out, &value.kind, indent, options)?;
    if let Some(units) = &value.units {
        write!(out, " <{units}>")?;
    }
    Ok(())
}

fn write_value_kind(
    out: &mut impl fmt::Write,
    kind: &ValueKind,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    match kind {
        ValueKind::Default => Ok(()),
        ValueKind::Integer(i) => {
            if i.base == 10 {
                write!(out, "{}", i.value)
            } else {
                let sign = if i.value < 0 { "-" } else { "" };
                let mut digits = radix_digits(i.value.unsigned_abs(), i.base);
                while digits.len() < i.digits as usize {
                    digits.insert(0, '0');
                }
                write!(out, "{sign}{}#{digits}#", i.base)
            }
        }
        ValueKind::Real(r) => write_real(out, r),
        ValueKind::String(s) => write_string(out, s),
        ValueKind::Array(a) => write_array(out, a, indent, options),
    }
}

fn radix_digits(mut value: u128, base: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % base as u128) as u32;
        digits.push(char::from_digit(digit, base).unwrap_or('0').to_ascii_uppercase());
        value /= base as u128;
    }
    digits.iter().rev().collect()
}

fn write_real(out: &mut impl fmt::Write, r: &RealValue) -> fmt::Result {
    match r.format {
        RealFormat::Fixed => write!(out, "{:.*}", r.precision as usize, r.value),
        RealFormat::Scientific => write!(out, "{:.*e}", r.precision as usize, r.value),
    }
}

fn write_string(out: &mut impl fmt::Write, s: &StringValue) -> fmt::Result {
    match s.kind {
        StringKind::Symbol => write!(out, "'{}'", escape_for_quotes(&s.text, '\'')),
        StringKind::Text => write!(out, "\"{}\"", escape_for_quotes(&s.text, '"')),
        StringKind::Identifier | StringKind::DateTime => write!(out, "{}", s.text),
    }
}

fn escape_for_quotes(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

const ARRAY_BREAK_EVERY: usize = 8;

fn write_array(
    out: &mut impl fmt::Write,
    array: &ArrayValue,
    indent: usize,
    options: &ListerOptions,
) -> fmt::Result {
    let (open, close) = match array.kind {
        ArrayKind::Set => ('{', '}'),
        ArrayKind::Sequence => ('(', ')'),
    };
    write!(out, "{open}")?;
    let multiline = options.contains(ListerOptions::INDENT_ARRAYS) && array.items.len() > ARRAY_BREAK_EVERY;
    for (index, item) in array.items.iter().enumerate() {
        if index > 0 {
            write!(out, ",")?;
        }
        if multiline && index % ARRAY_BREAK_EVERY == 0 {
            writeln!(out)?;
            write!(out, "{}", INDENT_UNIT.repeat(indent + 1))?;
        } else if index > 0 {
            write!(out, " ")?;
        }
        write_value(out, item, indent + 1, options)?;
    }
    if multiline {
        writeln!(out)?;
        write!(out, "{}", INDENT_UNIT.repeat(indent))?;
    }
    write!(out, "{close}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{Assignment, Parameter};
    use crate::value::{ArrayKind, StringKind};

    #[test]
    fn lists_simple_assignment() {
        let parameter = Parameter::Assignment(Assignment::new("LINES", Value::integer(10)));
        assert_eq!(list(&parameter, ListerOptions::default()), "LINES = 10");
    }

    #[test]
    fn lists_based_integer_with_padding() {
        let parameter = Parameter::Assignment(Assignment::new(
            "VALUE",
            Value::integer_based(255, 16, 2),
        ));
        assert_eq!(list(&parameter, ListerOptions::default()), "VALUE = 16#FF#");
    }

    #[test]
    fn lists_group_with_aligned_children() {
        let mut group = Aggregate::new(AggregateKind::Group, "IMAGE");
        group.append(Parameter::Assignment(Assignment::new(
            "LINES",
            Value::integer(10),
        )));
        group.append(Parameter::Assignment(Assignment::new(
            "LINE_SAMPLES",
            Value::integer(20),
        )));
        let text = list(&Parameter::Aggregate(group), ListerOptions::default());
        assert!(text.contains("LINES        = 10"));
        assert!(text.contains("LINE_SAMPLES = 20"));
        assert!(text.ends_with("END_GROUP = IMAGE"));
    }

    #[test]
    fn lists_quoted_string_by_kind() {
        let parameter = Parameter::Assignment(Assignment::new(
            "NAME",
            Value::string("Viking 1", StringKind::Text),
        ));
        assert_eq!(list(&parameter, ListerOptions::default()), "NAME = \"Viking 1\"");
    }

    #[test]
    fn lists_attached_comment_above_the_parameter() {
        let parameter = Parameter::Assignment(
            Assignment::new("LINES", Value::integer(10)).with_comment("image rows"),
        );
        let text = list(&parameter, ListerOptions::default());
        assert_eq!(text, "/* image rows */\nLINES = 10");
    }

    #[test]
    fn multi_line_comment_without_single_line_option() {
        let parameter = Parameter::Assignment(
            Assignment::new("LINES", Value::integer(10)).with_comment("row count\nfrom FITS header"),
        );
        let options = ListerOptions::default() - ListerOptions::SINGLE_LINE_COMMENTS;
        let text = list(&parameter, options);
        assert_eq!(text, "/*\nrow count\nfrom FITS header\n*/\nLINES = 10");
    }

    #[test]
    fn lists_sequence_array() {
        let parameter = Parameter::Assignment(Assignment::new(
            "A",
            Value::array(
                ArrayKind::Sequence,
                vec![Value::integer(1), Value::integer(2), Value::integer(3)],
            ),
        ));
        assert_eq!(list(&parameter, ListerOptions::default()), "A = (1, 2, 3)");
    }
}
