//! Error types for voltage-expr

use thiserror::Error;

/// Expression evaluation errors
///
/// Every variant aborts only the current evaluation pass. Aggregate history
/// retained by earlier passes is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// A function needed more operands than the stack held
    #[error("Stack underflow in {function}: requires {required} operand(s), {available} available")]
    StackUnderflow {
        function: &'static str,
        required: usize,
        available: usize,
    },

    /// An operand kind the function cannot combine
    #[error("Type mismatch in {function}: expected {expected}, found {found}")]
    TypeMismatch {
        function: &'static str,
        expected: &'static str,
        found: String,
    },

    /// No common synchronized timestamp exists yet; the host skips this record
    #[error("No synchronized value available")]
    SynchronizationUnavailable,

    /// The pass finished with a stack size other than one
    #[error("Unbalanced expression: {remaining} value(s) left on the stack")]
    UnbalancedStack { remaining: usize },

    /// Alias/ValueSynch operands do not have the shape the link phase needs
    #[error("Invalid link for {function}: {reason}")]
    InvalidLink {
        function: &'static str,
        reason: String,
    },

    #[error("Variable not found: {0}")]
    UnknownVariable(String),

    /// Postfix text could not be turned into a token
    #[error("Parse error at '{token}': {reason}")]
    Parse { token: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExprError {
    pub fn stack_underflow(function: &'static str, required: usize, available: usize) -> Self {
        Self::StackUnderflow {
            function,
            required,
            available,
        }
    }

    pub fn type_mismatch(
        function: &'static str,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            function,
            expected,
            found: found.into(),
        }
    }

    pub fn invalid_link(function: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            function,
            reason: reason.into(),
        }
    }

    pub fn parse(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the host may simply move on to the next record
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SynchronizationUnavailable)
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;
