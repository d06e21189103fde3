//! Date and time functions
//!
//! Dates are nanoseconds since the Unix epoch, evaluated in UTC. Int
//! operands are accepted wherever a Date is expected.

use super::{binary, text_operand, ternary, unary, OperatorSet};
use crate::date::{self, Component, Interval};
use crate::error::{ExprError, Result};
use crate::stack::OperandStack;
use crate::value::{TimedValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    Part(Component),
    DateAdd,
    DateDiff,
    DateSerial,
    TimeSerial,
    FormatDate,
    TimeStamp,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl OperatorSet for DateOp {
    const ALL: &'static [Self] = &[
        Self::Part(Component::Year),
        Self::Part(Component::Month),
        Self::Part(Component::Day),
        Self::Part(Component::Hour),
        Self::Part(Component::Minute),
        Self::Part(Component::Second),
        Self::Part(Component::Weekday),
        Self::Part(Component::DayOfYear),
        Self::DateAdd,
        Self::DateDiff,
        Self::DateSerial,
        Self::TimeSerial,
        Self::FormatDate,
        Self::TimeStamp,
        Self::Seconds,
        Self::Minutes,
        Self::Hours,
        Self::Days,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Part(Component::Year) => "Year",
            Self::Part(Component::Month) => "Month",
            Self::Part(Component::Day) => "Day",
            Self::Part(Component::Hour) => "Hour",
            Self::Part(Component::Minute) => "Minute",
            Self::Part(Component::Second) => "Second",
            Self::Part(Component::Weekday) => "Weekday",
            Self::Part(Component::DayOfYear) => "DayOfYear",
            Self::DateAdd => "DateAdd",
            Self::DateDiff => "DateDiff",
            Self::DateSerial => "DateSerial",
            Self::TimeSerial => "TimeSerial",
            Self::FormatDate => "FormatDate",
            Self::TimeStamp => "TimeStamp",
            Self::Seconds => "Seconds",
            Self::Minutes => "Minutes",
            Self::Hours => "Hours",
            Self::Days => "Days",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::DateAdd | Self::DateDiff | Self::DateSerial | Self::TimeSerial => 3,
            Self::FormatDate => 2,
            _ => 1,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        match self {
            Self::Part(which) => unary(stack, name, |d| {
                Ok(Value::Int(date::component(d.as_date(name)?, which)))
            }),
            Self::DateAdd => ternary(stack, name, |interval, n, d| {
                let interval = interval_operand(interval, name)?;
                let moved = date::add_interval(interval, n.as_i64(name)?, d.as_date(name)?)
                    .ok_or_else(|| ExprError::type_mismatch(name, "date in range", "overflow"))?;
                Ok(Value::Date(moved))
            }),
            Self::DateDiff => ternary(stack, name, |interval, d1, d2| {
                let interval = interval_operand(interval, name)?;
                Ok(Value::Int(date::diff_interval(
                    interval,
                    d1.as_date(name)?,
                    d2.as_date(name)?,
                )))
            }),
            Self::DateSerial => ternary(stack, name, |y, m, d| {
                date::date_serial(y.as_i64(name)?, m.as_i64(name)?, d.as_i64(name)?)
                    .map(Value::Date)
                    .ok_or_else(|| {
                        ExprError::type_mismatch(name, "valid calendar date", "out of range")
                    })
            }),
            Self::TimeSerial => ternary(stack, name, |h, m, s| {
                date::time_serial(h.as_i64(name)?, m.as_i64(name)?, s.as_i64(name)?)
                    .map(Value::Date)
                    .ok_or_else(|| ExprError::type_mismatch(name, "time in range", "overflow"))
            }),
            Self::FormatDate => binary(stack, name, |d, pattern| {
                let pattern = text_operand(pattern, name, "format pattern")?;
                date::format(d.as_date(name)?, pattern)
                    .map(Value::Text)
                    .ok_or_else(|| ExprError::type_mismatch(name, "strftime pattern", pattern))
            }),
            Self::TimeStamp => {
                let [x] = stack.pop_args::<1>(name)?;
                stack.push(TimedValue::date(x.timestamp, x.timestamp));
                Ok(())
            },
            Self::Seconds => span(stack, name, date::NANOS_PER_SECOND),
            Self::Minutes => span(stack, name, date::NANOS_PER_MINUTE),
            Self::Hours => span(stack, name, date::NANOS_PER_HOUR),
            Self::Days => span(stack, name, date::NANOS_PER_DAY),
        }
    }
}

fn interval_operand(value: &Value, function: &'static str) -> Result<Interval> {
    let code = text_operand(value, function, "interval code")?;
    Interval::from_code(code)
        .ok_or_else(|| ExprError::type_mismatch(function, "interval code", code))
}

fn span(stack: &mut OperandStack, name: &'static str, unit: i64) -> Result<()> {
    unary(stack, name, |count| {
        date::span(count.as_f64(name)?, unit)
            .map(Value::Int)
            .ok_or_else(|| ExprError::type_mismatch(name, "span in range", count.to_text()))
    })
}
