//! Value model
//!
//! A `Value` is exactly one of integer, double, text or date (nanoseconds
//! since the epoch). Every operand on the evaluation stack is a `TimedValue`:
//! a value paired with the instant it belongs to.

use crate::date;
use crate::error::{ExprError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Legacy boolean encoding: true is -1, false is 0
pub const TRUE: i64 = -1;
pub const FALSE: i64 = 0;

/// Timestamp carried by constants; never wins the newest-timestamp rule
pub const CONSTANT_TIMESTAMP: i64 = i64::MIN;

/// Relative tolerance of `compare_doubles` (7 significant digits)
const DOUBLE_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Text,
    Date,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Text => "Text",
            Self::Date => "Date",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    /// Nanoseconds since the Unix epoch
    Date(i64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Date(_) => ValueKind::Date,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Self::Int(if b { TRUE } else { FALSE })
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Numeric view; Date counts as its nanosecond integer
    pub fn as_f64(&self, function: &'static str) -> Result<f64> {
        match self {
            Self::Int(i) | Self::Date(i) => Ok(*i as f64),
            Self::Float(f) => Ok(*f),
            Self::Text(_) => Err(ExprError::type_mismatch(function, "number", "Text")),
        }
    }

    /// Integer view; floats round half away from zero and must be finite
    pub fn as_i64(&self, function: &'static str) -> Result<i64> {
        match self {
            Self::Int(i) | Self::Date(i) => Ok(*i),
            Self::Float(f) => float_to_i64(*f)
                .ok_or_else(|| ExprError::type_mismatch(function, "finite number", f.to_string())),
            Self::Text(_) => Err(ExprError::type_mismatch(function, "integer", "Text")),
        }
    }

    /// Date view; integers are taken as nanoseconds
    pub fn as_date(&self, function: &'static str) -> Result<i64> {
        match self {
            Self::Date(d) => Ok(*d),
            Self::Text(_) => Err(ExprError::type_mismatch(function, "date", "Text")),
            other => other.as_i64(function),
        }
    }

    /// Non-zero numbers are true
    pub fn is_truthy(&self, function: &'static str) -> Result<bool> {
        match self {
            Self::Int(i) | Self::Date(i) => Ok(*i != 0),
            Self::Float(f) => Ok(*f != 0.0),
            Self::Text(_) => Err(ExprError::type_mismatch(function, "boolean", "Text")),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Int(i) => itoa::Buffer::new().format(*i).to_string(),
            Self::Float(f) => format_double(*f),
            Self::Text(s) => s.clone(),
            Self::Date(d) => date::render(*d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A value and the instant it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub value: Value,
    pub timestamp: i64,
}

impl TimedValue {
    pub fn new(value: impl Into<Value>, timestamp: i64) -> Self {
        Self {
            value: value.into(),
            timestamp,
        }
    }

    /// A constant never dominates another operand's timestamp
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::new(value, CONSTANT_TIMESTAMP)
    }

    pub fn date(nanos: i64, timestamp: i64) -> Self {
        Self::new(Value::Date(nanos), timestamp)
    }
}

/// Newest of the operand timestamps
pub fn newest<'a>(operands: impl IntoIterator<Item = &'a TimedValue>) -> i64 {
    operands
        .into_iter()
        .map(|tv| tv.timestamp)
        .max()
        .unwrap_or(CONSTANT_TIMESTAMP)
}

/// Epsilon-tolerant comparison to 7 significant digits
///
/// `None` when either side is NaN.
pub fn compare_doubles(a: f64, b: f64) -> Option<Ordering> {
    if a.is_nan() || b.is_nan() {
        return None;
    }
    if a == b {
        return Some(Ordering::Equal);
    }
    if a.is_finite() && b.is_finite() {
        let scale = a.abs().max(b.abs());
        if (a - b).abs() <= DOUBLE_TOLERANCE * scale {
            return Some(Ordering::Equal);
        }
    }
    a.partial_cmp(&b)
}

pub(crate) fn float_to_i64(f: f64) -> Option<i64> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Shortest text for a double; integral values drop the fraction
pub fn format_double(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return itoa::Buffer::new().format(f as i64).to_string();
    }
    ryu::Buffer::new().format_finite(f).to_string()
}
