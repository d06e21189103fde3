//! Compiled expression: token arena, variable table and link state

use crate::config::ExpressionConfig;
use crate::error::{ExprError, Result};
use crate::evaluator;
use crate::functions::Function;
use crate::handler::{ExpressionHandler, NullHandler};
use crate::synch;
use crate::token::{Token, VariableTable};
use crate::value::{TimedValue, Value};
use tracing::{debug, trace};

/// A postfix expression ready for repeated evaluation
///
/// The arena is built once (by hand or with [`crate::parse_postfix`]), linked
/// once, then evaluated once per record. Stateful tokens keep their history
/// between passes, so an expression must not be shared across threads while
/// evaluating.
///
/// # Example
/// ```
/// use voltage_expr::{Expression, ExpressionConfig, Value};
///
/// let mut expr = Expression::new(ExpressionConfig::default())?;
/// expr.push_variable("P").push_constant(0.95);
/// expr.push_function("*")?;
///
/// expr.set_variable("P", 1000.0, 10)?;
/// let result = expr.evaluate_simple()?;
/// assert_eq!(result.value, Value::Float(950.0));
/// assert_eq!(result.timestamp, 10);
/// # Ok::<(), voltage_expr::ExprError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    tokens: Vec<Token>,
    variables: VariableTable,
    config: ExpressionConfig,
    last_synch: Option<usize>,
    linked: bool,
}

impl Default for Expression {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            variables: VariableTable::new(),
            config: ExpressionConfig::default(),
            last_synch: None,
            linked: false,
        }
    }
}

impl Expression {
    pub fn new(config: ExpressionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &ExpressionConfig {
        &self.config
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name())
    }

    /// True when any token keeps state between passes
    pub fn is_stateful(&self) -> bool {
        self.tokens.iter().any(|token| match token {
            Token::Synch(_) => true,
            Token::Function(f) => f.is_stateful(),
            _ => false,
        })
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self.linked = false;
        self
    }

    pub fn push_constant(&mut self, value: impl Into<Value>) -> &mut Self {
        self.push(Token::Constant(TimedValue::constant(value)))
    }

    pub fn push_variable(&mut self, name: &str) -> &mut Self {
        let id = self.variables.intern(name);
        self.push(Token::Variable(id))
    }

    /// Append a function by name or operator symbol
    pub fn push_function(&mut self, name: &str) -> Result<&mut Self> {
        let function = Function::from_name(name, &self.config)
            .ok_or_else(|| ExprError::parse(name, "unknown function"))?;
        Ok(self.push(Token::Function(function)))
    }

    /// Run the Alias / ValueSynch rewrites
    ///
    /// Idempotent; `evaluate` links on first use.
    pub fn link(&mut self) -> Result<()> {
        if self.linked {
            return Ok(());
        }
        self.last_synch = synch::link(&mut self.tokens, &self.variables, &self.config)?;
        self.linked = true;
        debug!(
            tokens = self.tokens.len(),
            variables = self.variables.len(),
            last_synch = ?self.last_synch,
            "expression linked"
        );
        Ok(())
    }

    /// Assign a variable's sample for the next pass
    pub fn set_variable(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        timestamp: i64,
    ) -> Result<()> {
        self.set_timed(name, TimedValue::new(value, timestamp))
    }

    pub fn set_timed(&mut self, name: &str, value: TimedValue) -> Result<()> {
        let id = self
            .variables
            .lookup(name)
            .ok_or_else(|| ExprError::unknown_variable(name))?;
        self.variables.set(id, value);
        Ok(())
    }

    /// Dry run of stack depths without evaluating anything
    pub fn validate(&self) -> Result<()> {
        let mut depth = 0usize;
        for token in &self.tokens {
            let (inputs, outputs) = token.arity();
            if depth < inputs {
                let function = match token {
                    Token::Function(f) => f.name(),
                    _ => "operand",
                };
                return Err(ExprError::stack_underflow(function, inputs, depth));
            }
            depth = depth - inputs + outputs;
        }
        if depth != 1 {
            return Err(ExprError::UnbalancedStack { remaining: depth });
        }
        Ok(())
    }

    /// Evaluate one pass, forwarding cursor directives to `handler`
    ///
    /// A failed pass keeps whatever state stateful tokens gathered before
    /// the failure.
    pub fn evaluate(&mut self, handler: &mut impl ExpressionHandler) -> Result<TimedValue> {
        self.link()?;
        let result = evaluator::run(&mut self.tokens, &self.variables, self.last_synch, handler);
        match &result {
            Ok(value) => trace!(value = %value.value, timestamp = value.timestamp, "pass complete"),
            Err(ExprError::SynchronizationUnavailable) => {
                debug!("no synchronized value for this pass")
            },
            Err(e) => debug!(error = %e, "pass failed"),
        }
        result
    }

    /// Evaluate ignoring cursor directives
    pub fn evaluate_simple(&mut self) -> Result<TimedValue> {
        self.evaluate(&mut NullHandler)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::handler::{CursorSettings, CursorStart};

    #[test]
    fn test_build_and_evaluate() {
        let mut expr = Expression::default();
        expr.push_variable("A").push_variable("B");
        expr.push_function("-").unwrap();
        expr.set_variable("A", 10_i64, 5).unwrap();
        expr.set_variable("B", 4_i64, 7).unwrap();

        let result = expr.evaluate_simple().unwrap();
        assert_eq!(result, TimedValue::new(6_i64, 7));
    }

    #[test]
    fn test_unknown_names() {
        let mut expr = Expression::default();
        assert!(matches!(
            expr.push_function("Frobnicate"),
            Err(ExprError::Parse { .. })
        ));
        expr.push_variable("A");
        assert_eq!(
            expr.set_variable("Z", 1_i64, 0),
            Err(ExprError::UnknownVariable("Z".to_string()))
        );
    }

    #[test]
    fn test_validate_depths() {
        let mut expr = Expression::default();
        expr.push_constant(1_i64).push_constant(2_i64);
        assert_eq!(
            expr.validate(),
            Err(ExprError::UnbalancedStack { remaining: 2 })
        );
        expr.push_function("+").unwrap();
        assert!(expr.validate().is_ok());
        expr.push_function("+").unwrap();
        assert_eq!(
            expr.validate(),
            Err(ExprError::stack_underflow("Addition", 2, 1))
        );
    }

    #[test]
    fn test_directive_reaches_handler() {
        let mut expr = Expression::default();
        expr.push_function("StartAtNewest").unwrap();
        expr.push_constant(1_i64);
        assert!(expr.validate().is_ok());

        let mut settings = CursorSettings::new();
        let result = expr.evaluate(&mut settings).unwrap();
        assert_eq!(result.value, Value::Int(1));
        assert_eq!(settings.start, Some(CursorStart::AtNewest));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExpressionConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert!(matches!(Expression::new(config), Err(ExprError::Config(_))));
    }

    #[test]
    fn test_is_stateful() {
        let mut expr = Expression::default();
        expr.push_variable("A").push_constant(3_i64);
        expr.push_function("+").unwrap();
        assert!(!expr.is_stateful());
        expr.push_constant(5_i64);
        expr.push_function("RunningAverage").unwrap();
        assert!(expr.is_stateful());
    }
}
