//! Cursor directives
//!
//! Directives validate their operands, forward them to the host's
//! `ExpressionHandler` and push nothing.

use crate::error::{ExprError, Result};
use crate::handler::ExpressionHandler;
use crate::stack::OperandStack;
use crate::value::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    StartAtRecord,
    StartAtTime,
    StartAtNewest,
    StartAfterNewest,
    StartRelativeToNewest,
    StartAtOffsetFromNewest,
    OrderOption,
    ReportOffset,
}

impl Directive {
    pub const ALL: &'static [Self] = &[
        Self::StartAtRecord,
        Self::StartAtTime,
        Self::StartAtNewest,
        Self::StartAfterNewest,
        Self::StartRelativeToNewest,
        Self::StartAtOffsetFromNewest,
        Self::OrderOption,
        Self::ReportOffset,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StartAtRecord => "StartAtRecord",
            Self::StartAtTime => "StartAtTime",
            Self::StartAtNewest => "StartAtNewest",
            Self::StartAfterNewest => "StartAfterNewest",
            Self::StartRelativeToNewest => "StartRelativeToNewest",
            Self::StartAtOffsetFromNewest => "StartAtOffsetFromNewest",
            Self::OrderOption => "OrderOption",
            Self::ReportOffset => "ReportOffset",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::StartAtRecord => 2,
            Self::StartAtNewest | Self::StartAfterNewest => 0,
            _ => 1,
        }
    }

    pub fn eval(self, stack: &mut OperandStack, handler: &mut dyn ExpressionHandler) -> Result<()> {
        let name = self.name();
        match self {
            Self::StartAtRecord => {
                let [record, year] = stack.pop_args::<2>(name)?;
                let (record, year) = (integral(&record.value, name)?, integral(&year.value, name)?);
                handler.set_start_at_record(record, year);
            },
            Self::StartAtTime => {
                let [date] = stack.pop_args::<1>(name)?;
                match date.value {
                    Value::Date(nanos) => handler.set_start_at_time(nanos),
                    other => {
                        return Err(ExprError::type_mismatch(
                            name,
                            "Date",
                            other.kind().to_string(),
                        ))
                    },
                }
            },
            Self::StartAtNewest => handler.set_start_at_newest(),
            Self::StartAfterNewest => handler.set_start_after_newest(),
            Self::StartRelativeToNewest => {
                let offset = single(stack, name)?;
                handler.set_start_relative_to_newest(offset);
            },
            Self::StartAtOffsetFromNewest => {
                let offset = single(stack, name)?;
                handler.set_start_at_offset_from_newest(offset);
            },
            Self::OrderOption => {
                let code = single(stack, name)?;
                handler.set_order_option(code);
            },
            Self::ReportOffset => {
                let value = single(stack, name)?;
                handler.set_report_offset(value);
            },
        }
        debug!(directive = name, "cursor directive applied");
        Ok(())
    }
}

fn single(stack: &mut OperandStack, name: &'static str) -> Result<i64> {
    let [operand] = stack.pop_args::<1>(name)?;
    integral(&operand.value, name)
}

/// Int, or a Float with no fractional part
fn integral(value: &Value, function: &'static str) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => value.as_i64(function),
        other => Err(ExprError::type_mismatch(
            function,
            "integer",
            other.to_text(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::handler::{CursorSettings, CursorStart};
    use crate::value::TimedValue;

    fn run(directive: Directive, operands: &[Value]) -> Result<(CursorSettings, usize)> {
        let mut stack = OperandStack::new();
        for v in operands {
            stack.push(TimedValue::constant(v.clone()));
        }
        let mut settings = CursorSettings::new();
        directive.eval(&mut stack, &mut settings)?;
        Ok((settings, stack.len()))
    }

    #[test]
    fn test_directives_push_nothing() {
        let (settings, left) = run(Directive::StartAtNewest, &[]).unwrap();
        assert_eq!(settings.start, Some(CursorStart::AtNewest));
        assert_eq!(left, 0);

        let (settings, left) =
            run(Directive::StartAtRecord, &[Value::Int(12), Value::Float(2024.0)]).unwrap();
        assert_eq!(
            settings.start,
            Some(CursorStart::AtRecord {
                record: 12,
                year: 2024
            })
        );
        assert_eq!(left, 0);
    }

    #[test]
    fn test_operand_validation() {
        assert!(run(Directive::OrderOption, &[Value::Float(1.5)]).is_err());
        assert!(run(Directive::ReportOffset, &[Value::text("3")]).is_err());
        assert!(run(Directive::StartAtTime, &[Value::Int(5)]).is_err());

        let (settings, _) = run(Directive::StartAtTime, &[Value::Date(5)]).unwrap();
        assert_eq!(settings.start, Some(CursorStart::AtTime { date: 5 }));
        let (settings, _) = run(Directive::ReportOffset, &[Value::Int(-2)]).unwrap();
        assert_eq!(settings.report_offset, Some(-2));
    }

    #[test]
    fn test_missing_operands_underflow() {
        let err = run(Directive::StartAtRecord, &[Value::Int(1)]).unwrap_err();
        assert_eq!(err, ExprError::stack_underflow("StartAtRecord", 2, 1));
    }
}
