//! PVL value literals.

use std::fmt;

/// Format in which a [`RealValue`] was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealFormat {
    Fixed,
    Scientific,
}

/// Kind of quoted/bare string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Single-quoted.
    Symbol,
    /// Double-quoted.
    Text,
    /// Bareword, no `-`/`:`.
    Identifier,
    /// Bareword containing `-` or `:`.
    DateTime,
}

/// `SET` (`{...}`) or `SEQUENCE` (`(...)`) array bracket kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Set,
    Sequence,
}

/// A multi-base integer literal. Base 10 is written as plain digits; any
/// other base is written `[±]base#digits#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerValue {
    pub value: i128,
    pub base: u32,
    /// Number of digits in the original literal (zero-padding preserved for
    /// round-trip listing), meaningless for base 10.
    pub digits: u32,
}

impl IntegerValue {
    #[must_use]
    pub fn decimal(value: i128) -> Self {
        IntegerValue {
            value,
            base: 10,
            digits: 0,
        }
    }
}

/// A real-number literal with enough formatting metadata to round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RealValue {
    pub value: f64,
    /// Digits after the decimal point (or after the exponent marker for
    /// scientific notation).
    pub precision: u32,
    pub format: RealFormat,
    pub showpoint: bool,
}

/// A quoted or bareword string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    pub text: String,
    pub kind: StringKind,
}

/// An ordered array of values, `{..}` (SET) or `(..)` (SEQUENCE), which may
/// nest.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub kind: ArrayKind,
    pub items: Vec<Value>,
}

/// The tagged-sum payload of a [`Value`], excluding its units suffix.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Integer(IntegerValue),
    Real(RealValue),
    String(StringValue),
    Array(ArrayValue),
    /// The sentinel produced when a parameter's value-list is present but
    /// empty — distinct from an explicit empty array.
    Default,
}

/// A typed PVL literal, optionally annotated with a `<units>` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub units: Option<String>,
}

impl Value {
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Value { kind, units: None }
    }

    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    #[must_use]
    pub fn integer(value: i128) -> Self {
        Self::new(ValueKind::Integer(IntegerValue::decimal(value)))
    }

    #[must_use]
    pub fn integer_based(value: i128, base: u32, digits: u32) -> Self {
        Self::new(ValueKind::Integer(IntegerValue {
            value,
            base,
            digits,
        }))
    }

    #[must_use]
    pub fn real(value: f64, precision: u32, format: RealFormat) -> Self {
        Self::new(ValueKind::Real(RealValue {
            value,
            precision,
            format,
            showpoint: true,
        }))
    }

    #[must_use]
    pub fn string(text: impl Into<String>, kind: StringKind) -> Self {
        Self::new(ValueKind::String(StringValue {
            text: text.into(),
            kind,
        }))
    }

    #[must_use]
    pub fn array(kind: ArrayKind, items: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(ArrayValue { kind, items }))
    }

    #[must_use]
    pub fn default_value() -> Self {
        Self::new(ValueKind::Default)
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.kind, ValueKind::String(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self.kind, ValueKind::Default)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(&s.text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match &self.kind {
            ValueKind::Integer(i) => Some(i.value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Real(r) => Some(r.value),
            ValueKind::Integer(i) => Some(i.value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Integer(_) => "Integer",
            ValueKind::Real(_) => "Real",
            ValueKind::String(s) => match s.kind {
                StringKind::Symbol => "Symbol",
                StringKind::Text => "Text",
                StringKind::Identifier => "Identifier",
                StringKind::DateTime => "Date_Time",
            },
            ValueKind::Array(a) => match a.kind {
                ArrayKind::Set => "Set",
                ArrayKind::Sequence => "Sequence",
            },
            ValueKind::Default => "Default",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::lister::write_value(f, self, 0, &Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip_fields() {
        let v = Value::integer_based(-255, 16, 2);
        assert_eq!(v.as_i128(), Some(-255));
        match &v.kind {
            ValueKind::Integer(i) => {
                assert_eq!(i.base, 16);
                assert_eq!(i.digits, 2);
            }
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn units_attach_to_value() {
        let v = Value::integer(3).with_units("m");
        assert_eq!(v.units.as_deref(), Some("m"));
    }
}
