//! Arithmetic operators
//!
//! Operands follow kind precedence (Text > Float > Int/Date). Division is
//! always floating point; integer division and `Mod` round their operands to
//! integers first.

use super::{binary, ternary, unary, OperatorSet, Pair};
use crate::error::{ExprError, Result};
use crate::stack::OperandStack;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulus,
    Power,
    Negate,
    Abs,
    Sign,
    Int,
    Fix,
    Round,
    Scale,
    Clamp,
    Min,
    Max,
}

impl OperatorSet for ArithOp {
    const ALL: &'static [Self] = &[
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::IntDivide,
        Self::Modulus,
        Self::Power,
        Self::Negate,
        Self::Abs,
        Self::Sign,
        Self::Int,
        Self::Fix,
        Self::Round,
        Self::Scale,
        Self::Clamp,
        Self::Min,
        Self::Max,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Add => "Addition",
            Self::Subtract => "Subtraction",
            Self::Multiply => "Multiplication",
            Self::Divide => "Division",
            Self::IntDivide => "IntegerDivision",
            Self::Modulus => "Mod",
            Self::Power => "Power",
            Self::Negate => "Neg",
            Self::Abs => "Abs",
            Self::Sign => "Sign",
            Self::Int => "Int",
            Self::Fix => "Fix",
            Self::Round => "Round",
            Self::Scale => "Scale",
            Self::Clamp => "Clamp",
            Self::Min => "Min",
            Self::Max => "Max",
        }
    }

    fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Add => Some("+"),
            Self::Subtract => Some("-"),
            Self::Multiply => Some("*"),
            Self::Divide => Some("/"),
            Self::IntDivide => Some("\\"),
            Self::Power => Some("^"),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Negate | Self::Abs | Self::Sign | Self::Int | Self::Fix => 1,
            Self::Clamp => 3,
            _ => 2,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        match self {
            Self::Add => binary(stack, name, add),
            Self::Subtract => binary(stack, name, |a, b| subtract(name, a, b)),
            Self::Multiply => binary(stack, name, |a, b| multiply(name, a, b)),
            Self::Divide => binary(stack, name, |a, b| {
                Ok(Value::Float(divide(a.as_f64(name)?, b.as_f64(name)?)))
            }),
            Self::IntDivide => binary(stack, name, |a, b| {
                let (n, d) = (a.as_i64(name)?, b.as_i64(name)?);
                if d == 0 {
                    return Ok(Value::Float(divide(n as f64, 0.0)));
                }
                Ok(Value::Int(n.wrapping_div(d)))
            }),
            Self::Modulus => binary(stack, name, |a, b| {
                let (n, d) = (a.as_i64(name)?, b.as_i64(name)?);
                if d == 0 {
                    return Ok(Value::Float(divide(n as f64, 0.0)));
                }
                Ok(Value::Int(n.wrapping_rem(d)))
            }),
            Self::Power => binary(stack, name, |a, b| {
                Ok(Value::Float(a.as_f64(name)?.powf(b.as_f64(name)?)))
            }),
            Self::Negate => unary(stack, name, |a| match a {
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Ok(Value::Int(other.as_i64(name)?.wrapping_neg())),
            }),
            Self::Abs => unary(stack, name, |a| match a {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Ok(Value::Int(other.as_i64(name)?.wrapping_abs())),
            }),
            Self::Sign => unary(stack, name, |a| match a {
                Value::Float(f) if f.is_nan() => Ok(Value::Float(f64::NAN)),
                Value::Float(f) => Ok(Value::Int(if *f > 0.0 {
                    1
                } else if *f < 0.0 {
                    -1
                } else {
                    0
                })),
                other => Ok(Value::Int(other.as_i64(name)?.signum())),
            }),
            Self::Int => unary(stack, name, |a| round_with(name, a, f64::floor)),
            Self::Fix => unary(stack, name, |a| round_with(name, a, f64::trunc)),
            Self::Round => binary(stack, name, |value, decimals| {
                let decimals = decimals.as_i64(name)?;
                match value {
                    Value::Int(i) if decimals >= 0 => Ok(Value::Int(*i)),
                    other => Ok(Value::Float(round_to(other.as_f64(name)?, decimals))),
                }
            }),
            Self::Scale => binary(stack, name, |value, factor| {
                Ok(Value::Float(value.as_f64(name)? * factor.as_f64(name)?))
            }),
            Self::Clamp => ternary(stack, name, |value, min, max| {
                let (min, max) = (min.as_f64(name)?, max.as_f64(name)?);
                if min > max {
                    return Err(ExprError::type_mismatch(
                        name,
                        "min <= max",
                        format!("{min} > {max}"),
                    ));
                }
                Ok(Value::Float(value.as_f64(name)?.max(min).min(max)))
            }),
            Self::Min => binary(stack, name, |a, b| extreme(name, a, b, false)),
            Self::Max => binary(stack, name, |a, b| extreme(name, a, b, true)),
        }
    }
}

/// Floating division; a zero divisor yields +Inf, or NaN for 0/0
pub(crate) fn divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 || numerator.is_nan() {
            f64::NAN
        } else {
            f64::INFINITY
        }
    } else {
        numerator / denominator
    }
}

fn add(a: &Value, b: &Value) -> Result<Value> {
    Ok(match Pair::of(a, b) {
        Pair::Text(x, y) => Value::Text(x + &y),
        Pair::Float(x, y) => Value::Float(x + y),
        Pair::Int(x, y, a_date, b_date) => {
            let sum = x.wrapping_add(y);
            if a_date || b_date {
                Value::Date(sum)
            } else {
                Value::Int(sum)
            }
        },
    })
}

fn subtract(name: &'static str, a: &Value, b: &Value) -> Result<Value> {
    match Pair::of(a, b) {
        Pair::Text(..) => Err(ExprError::type_mismatch(name, "number", "Text")),
        Pair::Float(x, y) => Ok(Value::Float(x - y)),
        // date - span stays a date; date - date is a span
        Pair::Int(x, y, true, false) => Ok(Value::Date(x.wrapping_sub(y))),
        Pair::Int(x, y, _, _) => Ok(Value::Int(x.wrapping_sub(y))),
    }
}

fn multiply(name: &'static str, a: &Value, b: &Value) -> Result<Value> {
    match Pair::of(a, b) {
        Pair::Text(..) => Err(ExprError::type_mismatch(name, "number", "Text")),
        Pair::Float(x, y) => Ok(Value::Float(x * y)),
        Pair::Int(x, y, _, _) => Ok(Value::Int(x.wrapping_mul(y))),
    }
}

fn round_with(name: &'static str, value: &Value, f: fn(f64) -> f64) -> Result<Value> {
    match value {
        Value::Float(x) => Ok(Value::Float(f(*x))),
        Value::Text(_) => Err(ExprError::type_mismatch(name, "number", "Text")),
        other => Ok(other.clone()),
    }
}

fn round_to(value: f64, decimals: i64) -> f64 {
    let decimals = decimals.clamp(-15, 15) as i32;
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

fn extreme(name: &'static str, a: &Value, b: &Value, max: bool) -> Result<Value> {
    match Pair::of(a, b) {
        Pair::Text(..) => Err(ExprError::type_mismatch(name, "number", "Text")),
        Pair::Float(x, y) => Ok(Value::Float(if max { x.max(y) } else { x.min(y) })),
        Pair::Int(x, y, _, _) => Ok(Value::Int(if max { x.max(y) } else { x.min(y) })),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::test_support::*;
    use crate::error::ExprError;
    use crate::value::Value;

    #[test]
    fn test_addition_kinds() {
        assert_eq!(apply("+", &[c(2_i64), c(3_i64)]).unwrap().value, Value::Int(5));
        assert_eq!(apply("+", &[c(2_i64), c(0.5)]).unwrap().value, Value::Float(2.5));
        assert_eq!(
            apply("+", &[c("kW"), c(2_i64)]).unwrap().value,
            Value::text("kW2")
        );
        assert_eq!(
            apply("+", &[c(Value::Date(10)), c(5_i64)]).unwrap().value,
            Value::Date(15)
        );
    }

    #[test]
    fn test_subtraction_and_division_pop_order() {
        // earlier-pushed operand is the minuend / dividend
        assert_eq!(apply("-", &[c(10_i64), c(4_i64)]).unwrap().value, Value::Int(6));
        assert_eq!(apply("/", &[c(10_i64), c(4_i64)]).unwrap().value, Value::Float(2.5));
        assert_eq!(apply("\\", &[c(10_i64), c(4_i64)]).unwrap().value, Value::Int(2));
        assert_eq!(apply("Mod", &[c(10_i64), c(4_i64)]).unwrap().value, Value::Int(2));
        assert_eq!(apply("^", &[c(2_i64), c(10_i64)]).unwrap().value, Value::Float(1024.0));
    }

    #[test]
    fn test_division_by_zero() {
        let result = apply("/", &[at(5_i64, 10), at(0_i64, 20)]).unwrap();
        assert_eq!(result.value, Value::Float(f64::INFINITY));
        assert_eq!(result.timestamp, 20);

        let result = apply("/", &[at(0_i64, 10), at(0.0, 5)]).unwrap();
        assert!(matches!(result.value, Value::Float(f) if f.is_nan()));
        assert_eq!(result.timestamp, 10);

        let result = apply("\\", &[c(7_i64), c(0_i64)]).unwrap();
        assert_eq!(result.value, Value::Float(f64::INFINITY));

        // the sign of the numerator does not flip the infinity
        let result = apply("/", &[c(-3.5), c(0_i64)]).unwrap();
        assert_eq!(result.value, Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_text_is_a_type_mismatch() {
        let err = apply("*", &[c("a"), c(2_i64)]).unwrap_err();
        assert!(matches!(err, ExprError::TypeMismatch { function: "Multiplication", .. }));
        assert!(apply("/", &[c(1_i64), c("b")]).is_err());
    }

    #[test]
    fn test_date_difference_is_a_span() {
        let result = apply("-", &[c(Value::Date(100)), c(Value::Date(40))]).unwrap();
        assert_eq!(result.value, Value::Int(60));
        let result = apply("-", &[c(Value::Date(100)), c(40_i64)]).unwrap();
        assert_eq!(result.value, Value::Date(60));
    }

    #[test]
    fn test_unary_and_rounding() {
        assert_eq!(apply("Neg", &[c(3_i64)]).unwrap().value, Value::Int(-3));
        assert_eq!(apply("Abs", &[c(-2.5)]).unwrap().value, Value::Float(2.5));
        assert_eq!(apply("Sign", &[c(-0.1)]).unwrap().value, Value::Int(-1));
        assert_eq!(apply("Int", &[c(-2.5)]).unwrap().value, Value::Float(-3.0));
        assert_eq!(apply("Fix", &[c(-2.5)]).unwrap().value, Value::Float(-2.0));
        assert_eq!(
            apply("Round", &[c(12.3456), c(2_i64)]).unwrap().value,
            Value::Float(12.35)
        );
        assert_eq!(apply("Round", &[c(7_i64), c(1_i64)]).unwrap().value, Value::Int(7));
    }

    #[test]
    fn test_scale_clamp_min_max() {
        assert_eq!(
            apply("Scale", &[c(100_i64), c(0.1)]).unwrap().value,
            Value::Float(10.0)
        );
        assert_eq!(
            apply("Clamp", &[c(150.0), c(0.0), c(100.0)]).unwrap().value,
            Value::Float(100.0)
        );
        assert!(apply("Clamp", &[c(1.0), c(5.0), c(0.0)]).is_err());
        assert_eq!(apply("Min", &[c(5_i64), c(3_i64)]).unwrap().value, Value::Int(3));
        assert_eq!(apply("Max", &[c(5_i64), c(3.5)]).unwrap().value, Value::Float(5.0));
    }
}
