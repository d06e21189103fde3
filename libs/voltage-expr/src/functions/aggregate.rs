//! Stateful aggregate and incremental functions
//!
//! Each token instance owns its history. The first operand is the sample
//! (value + timestamp); the second is the window control: a sample count, a
//! time range in nanoseconds, a calendar reset mode or a reset flag.

use crate::date::CalendarUnit;
use crate::error::{ExprError, Result};
use crate::stack::OperandStack;
use crate::state::{
    Boundary, CountWindow, DeltaState, IntegrateState, RateOfChangeState, ResetWindow, Sample,
    Statistic, TimeWindow,
};
use crate::value::{newest, TimedValue, Value};
use tracing::debug;

/// How an aggregate decides which samples to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Last N samples
    Count,
    /// Samples within a time range of the newest
    Time,
    /// Cleared at calendar boundaries
    Calendar,
    /// Cleared when the flag operand is true
    Flag,
}

struct AggregateDef {
    name: &'static str,
    policy: WindowPolicy,
    stat: Statistic,
}

const fn entry(name: &'static str, policy: WindowPolicy, stat: Statistic) -> AggregateDef {
    AggregateDef { name, policy, stat }
}

const AGGREGATES: &[AggregateDef] = &[
    entry("RunningAverage", WindowPolicy::Count, Statistic::Average),
    entry("RunningMax", WindowPolicy::Count, Statistic::Max),
    entry("RunningMin", WindowPolicy::Count, Statistic::Min),
    entry("RunningMedian", WindowPolicy::Count, Statistic::Median),
    entry("RunningTotal", WindowPolicy::Count, Statistic::Total),
    entry("RunningStdDev", WindowPolicy::Count, Statistic::StdDev),
    entry("TimeAverage", WindowPolicy::Time, Statistic::Average),
    entry("TimeMax", WindowPolicy::Time, Statistic::Max),
    entry("TimeMin", WindowPolicy::Time, Statistic::Min),
    entry("TimeMedian", WindowPolicy::Time, Statistic::Median),
    entry("TimeTotal", WindowPolicy::Time, Statistic::Total),
    entry("TimeStdDev", WindowPolicy::Time, Statistic::StdDev),
    entry("ResetAverage", WindowPolicy::Calendar, Statistic::Average),
    entry("ResetMax", WindowPolicy::Calendar, Statistic::Max),
    entry("ResetMin", WindowPolicy::Calendar, Statistic::Min),
    entry("ResetTotal", WindowPolicy::Calendar, Statistic::Total),
    entry("ResetStdDev", WindowPolicy::Calendar, Statistic::StdDev),
    entry("FlagResetAverage", WindowPolicy::Flag, Statistic::Average),
    entry("FlagResetMax", WindowPolicy::Flag, Statistic::Max),
    entry("FlagResetMin", WindowPolicy::Flag, Statistic::Min),
    entry("FlagResetTotal", WindowPolicy::Flag, Statistic::Total),
    entry("FlagResetStdDev", WindowPolicy::Flag, Statistic::StdDev),
];

/// Eviction boundary of the time-windowed functions
fn time_boundary(stat: Statistic) -> Boundary {
    match stat {
        Statistic::Average | Statistic::Total | Statistic::Median => Boundary::Exclusive,
        Statistic::Max | Statistic::Min | Statistic::StdDev => Boundary::Inclusive,
    }
}

/// Calendar reset mode codes: 0 never, 1 hourly .. 5 yearly
pub fn reset_unit(code: i64, function: &'static str) -> Result<Option<CalendarUnit>> {
    match code {
        0 => Ok(None),
        1 => Ok(Some(CalendarUnit::Hour)),
        2 => Ok(Some(CalendarUnit::Day)),
        3 => Ok(Some(CalendarUnit::Week)),
        4 => Ok(Some(CalendarUnit::Month)),
        5 => Ok(Some(CalendarUnit::Year)),
        other => Err(ExprError::type_mismatch(
            function,
            "reset mode 0-5",
            other.to_string(),
        )),
    }
}

#[derive(Debug, Clone)]
enum Retention {
    Count(CountWindow),
    Time(TimeWindow),
    Calendar(ResetWindow),
    Flag(ResetWindow),
}

/// A windowed statistic over one token's private history
#[derive(Debug, Clone)]
pub struct Aggregate {
    name: &'static str,
    stat: Statistic,
    retention: Retention,
}

impl Aggregate {
    pub fn from_name(name: &str, limit: usize) -> Option<Self> {
        let def = AGGREGATES
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))?;
        let retention = match def.policy {
            WindowPolicy::Count => Retention::Count(CountWindow::new(limit)),
            WindowPolicy::Time => {
                Retention::Time(TimeWindow::new(time_boundary(def.stat), limit))
            },
            WindowPolicy::Calendar => Retention::Calendar(ResetWindow::new(limit)),
            WindowPolicy::Flag => Retention::Flag(ResetWindow::new(limit)),
        };
        Some(Self {
            name: def.name,
            stat: def.stat,
            retention,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn statistic(&self) -> Statistic {
        self.stat
    }

    pub fn policy(&self) -> WindowPolicy {
        match self.retention {
            Retention::Count(_) => WindowPolicy::Count,
            Retention::Time(_) => WindowPolicy::Time,
            Retention::Calendar(_) => WindowPolicy::Calendar,
            Retention::Flag(_) => WindowPolicy::Flag,
        }
    }

    pub fn eval(&mut self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name;
        let [value, control] = stack.pop_args::<2>(name)?;
        let x = value.value.as_f64(name)?;
        let sample = Sample::new(value.timestamp, x);
        // control operands are decoded before the window is touched
        let history = match &mut self.retention {
            Retention::Count(w) => {
                let count = control.value.as_i64(name)?;
                w.add(sample, count)
            },
            Retention::Time(w) => {
                let range = control.value.as_i64(name)?;
                w.add(sample, range)
            },
            Retention::Calendar(w) => {
                let unit = reset_unit(control.value.as_i64(name)?, name)?;
                w.add_calendar(sample, unit)
            },
            Retention::Flag(w) => {
                let reset = control.value.is_truthy(name)?;
                w.add_flagged(sample, reset)
            },
        };
        let result = history.evaluate(self.stat);
        debug!(
            function = name,
            value = x,
            retained = history.len(),
            result,
            "aggregate updated"
        );

        stack.push(TimedValue::new(result, newest([&value, &control])));
        Ok(())
    }
}

/// Running calculations carried over from one pass to the next
#[derive(Debug, Clone)]
pub enum Incremental {
    /// `Integrate(value, factor)`
    Integrate(IntegrateState),
    /// `RateOfChange(value)`, per second
    RateOfChange(RateOfChangeState),
    /// `Delta(value)`
    Delta(DeltaState),
}

impl Incremental {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "integrate" => Some(Self::Integrate(IntegrateState::default())),
            "rateofchange" => Some(Self::RateOfChange(RateOfChangeState::default())),
            "delta" => Some(Self::Delta(DeltaState::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Integrate(_) => "Integrate",
            Self::RateOfChange(_) => "RateOfChange",
            Self::Delta(_) => "Delta",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Integrate(_) => 2,
            _ => 1,
        }
    }

    pub fn eval(&mut self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        let (result, timestamp) = match self {
            Self::Integrate(state) => {
                let [value, control] = stack.pop_args::<2>(name)?;
                let x = value.value.as_f64(name)?;
                let factor = factor_operand(&control.value, name)?;
                let result = state.update(Sample::new(value.timestamp, x), factor);
                (result, newest([&value, &control]))
            },
            Self::RateOfChange(state) => {
                let [value] = stack.pop_args::<1>(name)?;
                let x = value.value.as_f64(name)?;
                (state.update(Sample::new(value.timestamp, x)), value.timestamp)
            },
            Self::Delta(state) => {
                let [value] = stack.pop_args::<1>(name)?;
                (state.update(value.value.as_f64(name)?), value.timestamp)
            },
        };
        debug!(function = name, result, "incremental updated");
        stack.push(TimedValue::new(Value::Float(result), timestamp));
        Ok(())
    }
}

fn factor_operand(value: &Value, function: &'static str) -> Result<f64> {
    let factor = value.as_f64(function)?;
    if factor.is_finite() {
        Ok(factor)
    } else {
        Err(ExprError::type_mismatch(function, "finite factor", factor.to_string()))
    }
}
