//! Comparison and bitwise operators
//!
//! Comparisons return the legacy booleans (-1 / 0). The left-hand side of a
//! comparison is the operand pushed LATER, so `a b <` tests `b < a`.

use super::{binary, unary, OperatorSet, Pair};
use crate::error::Result;
use crate::stack::OperandStack;
use crate::value::{compare_doubles, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl CompareOp {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            // NaN compares unequal to everything
            return self == Self::NotEqual;
        };
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::Greater => ordering == Ordering::Greater,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

impl OperatorSet for CompareOp {
    const ALL: &'static [Self] = &[
        Self::Equal,
        Self::NotEqual,
        Self::Less,
        Self::Greater,
        Self::LessOrEqual,
        Self::GreaterOrEqual,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Equal => "IsEqual",
            Self::NotEqual => "IsNotEqual",
            Self::Less => "IsLess",
            Self::Greater => "IsGreater",
            Self::LessOrEqual => "IsLessOrEqual",
            Self::GreaterOrEqual => "IsGreaterOrEqual",
        }
    }

    fn symbol(self) -> Option<&'static str> {
        Some(match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
        })
    }

    fn arity(self) -> usize {
        2
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        binary(stack, self.name(), |earlier, later| {
            Ok(Value::from_bool(self.holds(compare(later, earlier))))
        })
    }
}

/// Ordering of `lhs` against `rhs` under kind precedence
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match Pair::of(lhs, rhs) {
        Pair::Text(a, b) => Some(a.cmp(&b)),
        Pair::Float(a, b) => compare_doubles(a, b),
        Pair::Int(a, b, _, _) => Some(a.cmp(&b)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Not,
}

impl OperatorSet for BitOp {
    const ALL: &'static [Self] = &[Self::And, Self::Or, Self::Xor, Self::Not];

    fn name(self) -> &'static str {
        match self {
            Self::And => "And",
            Self::Or => "Or",
            Self::Xor => "Xor",
            Self::Not => "Not",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Not => 1,
            _ => 2,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        if self == Self::Not {
            return unary(stack, name, |a| Ok(Value::Int(!a.as_i64(name)?)));
        }
        binary(stack, name, |a, b| {
            let (a, b) = (a.as_i64(name)?, b.as_i64(name)?);
            Ok(Value::Int(match self {
                Self::And => a & b,
                Self::Or => a | b,
                _ => a ^ b,
            }))
        })
    }
}
