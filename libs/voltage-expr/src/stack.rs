//! Operand stack for one evaluation pass

use crate::error::{ExprError, Result};
use crate::value::TimedValue;

/// Last-in-first-out operand stack
///
/// Created empty at the start of a pass. Functions check their own arity
/// through `pop_args`; the evaluator never pre-checks on their behalf.
#[derive(Debug, Default)]
pub struct OperandStack {
    entries: Vec<TimedValue>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: TimedValue) {
        self.entries.push(value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pop the most recently pushed operand
    pub fn pop(&mut self, function: &'static str) -> Result<TimedValue> {
        self.entries
            .pop()
            .ok_or_else(|| ExprError::stack_underflow(function, 1, 0))
    }

    /// Pop `N` operands, returned in push order (`[0]` was pushed earliest)
    pub fn pop_args<const N: usize>(&mut self, function: &'static str) -> Result<[TimedValue; N]> {
        let available = self.entries.len();
        if available < N {
            return Err(ExprError::stack_underflow(function, N, available));
        }
        let tail = self.entries.split_off(available - N);
        tail.try_into()
            .map_err(|_| ExprError::stack_underflow(function, N, available))
    }

    /// Take the single result left by a complete pass
    pub fn into_result(mut self) -> Result<TimedValue> {
        if self.entries.len() != 1 {
            return Err(ExprError::UnbalancedStack {
                remaining: self.entries.len(),
            });
        }
        self.pop("result")
    }
}
