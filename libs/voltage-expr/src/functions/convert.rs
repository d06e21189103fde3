//! Conversions, NaN checks and the conditional

use super::{ternary, unary, OperatorSet};
use crate::date;
use crate::error::{ExprError, Result};
use crate::stack::OperandStack;
use crate::value::{float_to_i64, Value};
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOp {
    CInt,
    CDbl,
    CStr,
    CDate,
    Val,
    IsNaN,
    IsFinite,
    If,
}

impl OperatorSet for ConvertOp {
    const ALL: &'static [Self] = &[
        Self::CInt,
        Self::CDbl,
        Self::CStr,
        Self::CDate,
        Self::Val,
        Self::IsNaN,
        Self::IsFinite,
        Self::If,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::CInt => "CInt",
            Self::CDbl => "CDbl",
            Self::CStr => "CStr",
            Self::CDate => "CDate",
            Self::Val => "Val",
            Self::IsNaN => "IsNaN",
            Self::IsFinite => "IsFinite",
            Self::If => "If",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::If => 3,
            _ => 1,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        match self {
            Self::CInt => unary(stack, name, |v| match v {
                Value::Text(s) => {
                    let f = parse_number(s)
                        .ok_or_else(|| ExprError::type_mismatch(name, "numeric text", s.clone()))?;
                    float_to_i64(f)
                        .map(Value::Int)
                        .ok_or_else(|| ExprError::type_mismatch(name, "finite number", s.clone()))
                },
                other => Ok(Value::Int(other.as_i64(name)?)),
            }),
            Self::CDbl => unary(stack, name, |v| match v {
                Value::Text(s) => parse_number(s)
                    .map(Value::Float)
                    .ok_or_else(|| ExprError::type_mismatch(name, "numeric text", s.clone())),
                other => Ok(Value::Float(other.as_f64(name)?)),
            }),
            Self::CStr => unary(stack, name, |v| Ok(Value::Text(v.to_text()))),
            Self::CDate => unary(stack, name, |v| match v {
                Value::Text(s) => date::parse(s)
                    .map(Value::Date)
                    .ok_or_else(|| ExprError::type_mismatch(name, "date text", s.clone())),
                other => Ok(Value::Date(other.as_date(name)?)),
            }),
            Self::Val => unary(stack, name, |v| match v {
                Value::Text(s) => Ok(leading_number(s)),
                other => Ok(other.clone()),
            }),
            Self::IsNaN => unary(stack, name, |v| Ok(Value::from_bool(v.as_f64(name)?.is_nan()))),
            Self::IsFinite => unary(stack, name, |v| {
                Ok(Value::from_bool(v.as_f64(name)?.is_finite()))
            }),
            Self::If => ternary(stack, name, |cond, then, otherwise| {
                Ok(if cond.is_truthy(name)? {
                    then.clone()
                } else {
                    otherwise.clone()
                })
            }),
        }
    }
}

#[allow(clippy::disallowed_methods)] // literal pattern, always valid
static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
});

/// Whole text as a number (surrounding whitespace allowed)
fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// `Val`: the leading numeric prefix, 0 when there is none
fn leading_number(text: &str) -> Value {
    let Some(prefix) = NUMBER_PREFIX.captures(text).and_then(|c| c.get(1)) else {
        return Value::Int(0);
    };
    let prefix = prefix.as_str();
    if !prefix.contains(['.', 'e', 'E']) {
        if let Ok(i) = prefix.parse::<i64>() {
            return Value::Int(i);
        }
    }
    prefix.parse::<f64>().map_or(Value::Int(0), Value::Float)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::test_support::*;
    use crate::date;
    use crate::value::{Value, FALSE, TRUE};

    fn eval(name: &str, operand: impl Into<Value>) -> Value {
        apply(name, &[c(operand)]).unwrap().value
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(eval("CInt", 2.5), Value::Int(3));
        assert_eq!(eval("CInt", -2.5), Value::Int(-3));
        assert_eq!(eval("CInt", " 41.6 "), Value::Int(42));
        assert!(apply("CInt", &[c("forty")]).is_err());
        assert_eq!(eval("CDbl", 7_i64), Value::Float(7.0));
        assert_eq!(eval("CDbl", "1e3"), Value::Float(1000.0));
        assert_eq!(eval("CStr", 0.25), Value::text("0.25"));
    }

    #[test]
    fn test_cdate() {
        let expected = date::parse("2024-03-01 12:00:00").unwrap();
        assert_eq!(eval("CDate", "2024-03-01 12:00:00"), Value::Date(expected));
        assert_eq!(eval("CDate", 5_i64), Value::Date(5));
        assert!(apply("CDate", &[c("not a date")]).is_err());
    }

    #[test]
    fn test_val_reads_leading_number() {
        assert_eq!(eval("Val", "  42 kW"), Value::Int(42));
        assert_eq!(eval("Val", "-1.5e2x"), Value::Float(-150.0));
        assert_eq!(eval("Val", "kW"), Value::Int(0));
        assert_eq!(eval("Val", 3.5), Value::Float(3.5));
    }

    #[test]
    fn test_nan_checks() {
        assert_eq!(eval("IsNaN", f64::NAN), Value::Int(TRUE));
        assert_eq!(eval("IsNaN", 1_i64), Value::Int(FALSE));
        assert_eq!(eval("IsFinite", f64::INFINITY), Value::Int(FALSE));
    }

    #[test]
    fn test_if_takes_newest_timestamp() {
        let result = apply("If", &[at(TRUE, 5), at("on", 9), at("off", 7)]).unwrap();
        assert_eq!(result.value, Value::text("on"));
        assert_eq!(result.timestamp, 9);

        let result = apply("If", &[at(0.0, 5), c("on"), c("off")]).unwrap();
        assert_eq!(result.value, Value::text("off"));
        assert_eq!(result.timestamp, 5);
    }
}
