//! Single-pass postfix evaluator
//!
//! Walks the token arena left to right: operands push their `TimedValue`,
//! functions pop and push through their own `eval`. The pass never
//! backtracks and leaves exactly one value on a well-formed stack.

use crate::error::{ExprError, Result};
use crate::handler::ExpressionHandler;
use crate::stack::OperandStack;
use crate::synch;
use crate::token::{Token, VariableTable};
use crate::value::TimedValue;
use tracing::trace;

/// Run one evaluation pass
///
/// # Arguments
/// * `tokens` - linked token arena; stateful tokens update in place
/// * `variables` - current inputs, assigned by the host before the pass
/// * `last_synch` - position of the trailing `SynchVariable`, if any
/// * `handler` - receiver of cursor directives
pub(crate) fn run(
    tokens: &mut [Token],
    variables: &VariableTable,
    last_synch: Option<usize>,
    handler: &mut dyn ExpressionHandler,
) -> Result<TimedValue> {
    let common = match last_synch {
        Some(_) => synch::observe_all(tokens, variables),
        None => None,
    };

    let mut stack = OperandStack::with_capacity(tokens.len());
    for index in 0..tokens.len() {
        trace!(
            index,
            token = %tokens[index].describe(variables),
            depth = stack.len(),
            "evaluate token"
        );
        match &mut tokens[index] {
            Token::Constant(tv) => stack.push(tv.clone()),
            Token::Variable(id) => {
                let variable = variables
                    .get(*id)
                    .ok_or_else(|| ExprError::unknown_variable(format!("#{}", id.0)))?;
                stack.push(variable.value().clone());
            },
            Token::Synch(synch_variable) => {
                let key = common.ok_or(ExprError::SynchronizationUnavailable)?;
                stack.push(synch_variable.report(key)?);
                if last_synch == Some(index) {
                    synch::trim_all(tokens, key);
                }
            },
            Token::Function(function) => function.eval(&mut stack, handler)?,
        }
    }

    stack.into_result()
}
