//! Scalar cell values

use crate::record::FieldKind;
use std::fmt;

/// A single scalar value held by a record field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Parses a raw CSV cell according to the expected kind
    ///
    /// Empty cells are absent values. Cells that fail to parse as the
    /// expected numeric kind are kept as text rather than dropped.
    pub fn from_cell(raw: &str, kind: FieldKind) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let parsed = match kind {
            FieldKind::Text => None,
            FieldKind::Integer => raw
                .parse::<i64>()
                .ok()
                .map(Value::Integer)
                // integer columns with gaps are often written as floats ("312.0")
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| Value::Integer(f as i64))
                }),
            FieldKind::Float => raw.parse::<f64>().ok().map(Value::Float),
        };

        Some(parsed.unwrap_or_else(|| Value::Text(raw.to_string())))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; text is parsed when it looks numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}
