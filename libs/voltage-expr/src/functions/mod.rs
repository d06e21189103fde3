//! Built-in function library
//!
//! Functions are a closed set. Stateless operators are plain `Copy` enums
//! grouped by category; stateful functions (aggregates, incremental
//! calculations) carry their private history inside the token.
//!
//! Every function pops its own operands through `OperandStack::pop_args`,
//! which reports `StackUnderflow` when fewer are available, and pushes at
//! most one result.

pub mod aggregate;
pub mod arithmetic;
pub mod convert;
pub mod cursor;
pub mod datetime;
pub mod logical;
pub mod math;
pub mod text;

use crate::config::ExpressionConfig;
use crate::error::{ExprError, Result};
use crate::handler::ExpressionHandler;
use crate::stack::OperandStack;
use crate::value::{newest, TimedValue, Value};

pub use aggregate::{Aggregate, Incremental};
pub use arithmetic::ArithOp;
pub use convert::ConvertOp;
pub use cursor::Directive;
pub use datetime::DateOp;
pub use logical::{BitOp, CompareOp};
pub use math::MathOp;
pub use text::TextOp;

pub const ALIAS: &str = "Alias";
pub const VALUE_SYNCH: &str = "ValueSynch";

/// A category of stateless operators
pub trait OperatorSet: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    /// Operator spelling accepted besides the name (`+`, `<=`, ...)
    fn symbol(self) -> Option<&'static str> {
        None
    }

    fn arity(self) -> usize;

    fn eval(self, stack: &mut OperandStack) -> Result<()>;

    fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.symbol() == Some(name) || op.name().eq_ignore_ascii_case(name))
    }
}

/// Any stateless operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Arith(ArithOp),
    Compare(CompareOp),
    Bit(BitOp),
    Math(MathOp),
    Text(TextOp),
    Convert(ConvertOp),
    Date(DateOp),
}

impl Operator {
    pub fn lookup(name: &str) -> Option<Self> {
        ArithOp::lookup(name)
            .map(Self::Arith)
            .or_else(|| CompareOp::lookup(name).map(Self::Compare))
            .or_else(|| BitOp::lookup(name).map(Self::Bit))
            .or_else(|| MathOp::lookup(name).map(Self::Math))
            .or_else(|| TextOp::lookup(name).map(Self::Text))
            .or_else(|| ConvertOp::lookup(name).map(Self::Convert))
            .or_else(|| DateOp::lookup(name).map(Self::Date))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Arith(op) => op.name(),
            Self::Compare(op) => op.name(),
            Self::Bit(op) => op.name(),
            Self::Math(op) => op.name(),
            Self::Text(op) => op.name(),
            Self::Convert(op) => op.name(),
            Self::Date(op) => op.name(),
        }
    }

    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Arith(op) => op.symbol(),
            Self::Compare(op) => op.symbol(),
            Self::Bit(op) => op.symbol(),
            Self::Math(op) => op.symbol(),
            Self::Text(op) => op.symbol(),
            Self::Convert(op) => op.symbol(),
            Self::Date(op) => op.symbol(),
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Arith(op) => op.arity(),
            Self::Compare(op) => op.arity(),
            Self::Bit(op) => op.arity(),
            Self::Math(op) => op.arity(),
            Self::Text(op) => op.arity(),
            Self::Convert(op) => op.arity(),
            Self::Date(op) => op.arity(),
        }
    }

    pub fn eval(self, stack: &mut OperandStack) -> Result<()> {
        match self {
            Self::Arith(op) => op.eval(stack),
            Self::Compare(op) => op.eval(stack),
            Self::Bit(op) => op.eval(stack),
            Self::Math(op) => op.eval(stack),
            Self::Text(op) => op.eval(stack),
            Self::Convert(op) => op.eval(stack),
            Self::Date(op) => op.eval(stack),
        }
    }
}

/// A function token
#[derive(Debug, Clone)]
pub enum Function {
    Operator(Operator),
    Aggregate(Aggregate),
    Incremental(Incremental),
    /// `Alias(variable, "name")`: rewritten at link time, passes the variable through
    Alias,
    /// `ValueSynch(variable)`: rewritten at link time, passes the operand through
    ValueSynch,
    Directive(Directive),
}

impl Function {
    /// Resolve a function by name or operator symbol (names are case-insensitive)
    ///
    /// Stateful functions start with empty history.
    pub fn from_name(name: &str, config: &ExpressionConfig) -> Option<Self> {
        if name.eq_ignore_ascii_case(ALIAS) {
            return Some(Self::Alias);
        }
        if name.eq_ignore_ascii_case(VALUE_SYNCH) {
            return Some(Self::ValueSynch);
        }
        Operator::lookup(name)
            .map(Self::Operator)
            .or_else(|| Aggregate::from_name(name, config.history_limit).map(Self::Aggregate))
            .or_else(|| Incremental::from_name(name).map(Self::Incremental))
            .or_else(|| Directive::lookup(name).map(Self::Directive))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Operator(op) => op.name(),
            Self::Aggregate(agg) => agg.name(),
            Self::Incremental(inc) => inc.name(),
            Self::Alias => ALIAS,
            Self::ValueSynch => VALUE_SYNCH,
            Self::Directive(d) => d.name(),
        }
    }

    /// Operands consumed and results produced
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Operator(op) => (op.arity(), 1),
            Self::Aggregate(_) => (2, 1),
            Self::Incremental(inc) => (inc.arity(), 1),
            Self::Alias => (2, 1),
            Self::ValueSynch => (1, 1),
            Self::Directive(d) => (d.arity(), 0),
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, Self::Aggregate(_) | Self::Incremental(_))
    }

    pub fn eval(
        &mut self,
        stack: &mut OperandStack,
        handler: &mut dyn ExpressionHandler,
    ) -> Result<()> {
        match self {
            Self::Operator(op) => op.eval(stack),
            Self::Aggregate(agg) => agg.eval(stack),
            Self::Incremental(inc) => inc.eval(stack),
            Self::Alias => {
                let [variable, name] = stack.pop_args::<2>(ALIAS)?;
                if !name.value.is_text() {
                    return Err(ExprError::type_mismatch(
                        ALIAS,
                        "alias name text",
                        name.value.kind().to_string(),
                    ));
                }
                stack.push(variable);
                Ok(())
            },
            Self::ValueSynch => {
                let [operand] = stack.pop_args::<1>(VALUE_SYNCH)?;
                stack.push(operand);
                Ok(())
            },
            Self::Directive(d) => d.eval(stack, handler),
        }
    }
}

/// Operand pair classified by kind precedence: Text, then Float, then Int/Date
pub(crate) enum Pair {
    Text(String, String),
    Float(f64, f64),
    /// Integer arithmetic; flags mark which side was a Date
    Int(i64, i64, bool, bool),
}

impl Pair {
    pub(crate) fn of(a: &Value, b: &Value) -> Self {
        match (a, b) {
            (Value::Text(_), _) | (_, Value::Text(_)) => Self::Text(a.to_text(), b.to_text()),
            (Value::Float(x), other) => Self::Float(*x, numeric(other)),
            (other, Value::Float(y)) => Self::Float(numeric(other), *y),
            (Value::Int(x) | Value::Date(x), Value::Int(y) | Value::Date(y)) => Self::Int(
                *x,
                *y,
                matches!(a, Value::Date(_)),
                matches!(b, Value::Date(_)),
            ),
        }
    }
}

fn numeric(value: &Value) -> f64 {
    match value {
        Value::Int(i) | Value::Date(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Text(_) => f64::NAN,
    }
}

pub(crate) fn text_operand<'a>(
    value: &'a Value,
    function: &'static str,
    expected: &'static str,
) -> Result<&'a str> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(ExprError::type_mismatch(
            function,
            expected,
            other.kind().to_string(),
        )),
    }
}

/// Pop one operand, push `f(value)` stamped with the operand's timestamp
pub(crate) fn unary(
    stack: &mut OperandStack,
    function: &'static str,
    f: impl FnOnce(&Value) -> Result<Value>,
) -> Result<()> {
    let [a] = stack.pop_args::<1>(function)?;
    let value = f(&a.value)?;
    stack.push(TimedValue::new(value, a.timestamp));
    Ok(())
}

/// Pop two operands and call `f(earlier, later)` in push order
pub(crate) fn binary(
    stack: &mut OperandStack,
    function: &'static str,
    f: impl FnOnce(&Value, &Value) -> Result<Value>,
) -> Result<()> {
    let [a, b] = stack.pop_args::<2>(function)?;
    let value = f(&a.value, &b.value)?;
    stack.push(TimedValue::new(value, newest([&a, &b])));
    Ok(())
}

/// Pop three operands and call `f(first, second, third)` in push order
pub(crate) fn ternary(
    stack: &mut OperandStack,
    function: &'static str,
    f: impl FnOnce(&Value, &Value, &Value) -> Result<Value>,
) -> Result<()> {
    let [a, b, c] = stack.pop_args::<3>(function)?;
    let value = f(&a.value, &b.value, &c.value)?;
    stack.push(TimedValue::new(value, newest([&a, &b, &c])));
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::handler::NullHandler;

    /// Evaluate `function` over the given operands (push order)
    pub(crate) fn apply(name: &str, operands: &[TimedValue]) -> Result<TimedValue> {
        let mut function = Function::from_name(name, &ExpressionConfig::default())
            .unwrap_or_else(|| panic!("unknown function {name}"));
        apply_to(&mut function, operands)
    }

    pub(crate) fn apply_to(function: &mut Function, operands: &[TimedValue]) -> Result<TimedValue> {
        let mut stack = OperandStack::new();
        for operand in operands {
            stack.push(operand.clone());
        }
        function.eval(&mut stack, &mut NullHandler)?;
        stack.pop("test")
    }

    pub(crate) fn c(value: impl Into<Value>) -> TimedValue {
        TimedValue::constant(value)
    }

    pub(crate) fn at(value: impl Into<Value>, timestamp: i64) -> TimedValue {
        TimedValue::new(value, timestamp)
    }
}
