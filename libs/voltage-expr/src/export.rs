//! JavaScript export of a postfix expression
//!
//! Rebuilds an infix JavaScript expression for client-side re-evaluation.
//! Variables read from a `v` object, non-native functions call into an
//! `Expr` helper object. Relational operators keep the evaluator's operand
//! sense (the later-pushed operand on the left) and yield -1 / 0.

use crate::error::{ExprError, Result};
use crate::expression::Expression;
use crate::functions::{
    ArithOp, BitOp, CompareOp, ConvertOp, Function, MathOp, Operator, OperatorSet, TextOp,
};
use crate::token::{Token, VarId, VariableTable};
use crate::value::{format_double, Value};

impl Expression {
    /// Render the expression as a JavaScript expression string
    ///
    /// Directives render as `Expr.<name>(..)` calls joined in front of the
    /// result with the comma operator.
    pub fn format_js(&self) -> Result<String> {
        let variables = self.variables();
        let mut stack: Vec<String> = Vec::new();
        let mut directives: Vec<String> = Vec::new();

        for token in self.tokens() {
            match token {
                Token::Constant(tv) => stack.push(literal(&tv.value)),
                Token::Variable(id) => stack.push(variable(variables, *id)),
                Token::Synch(s) => {
                    stack.push(format!("Expr.Synch({})", variable(variables, s.variable())));
                },
                Token::Function(f) => {
                    let (inputs, outputs) = f.arity();
                    if stack.len() < inputs {
                        return Err(ExprError::stack_underflow(f.name(), inputs, stack.len()));
                    }
                    let args = stack.split_off(stack.len() - inputs);
                    let rendered = render(f, &args);
                    if outputs == 0 {
                        directives.push(rendered);
                    } else {
                        stack.push(rendered);
                    }
                },
            }
        }

        if stack.len() != 1 {
            return Err(ExprError::UnbalancedStack {
                remaining: stack.len(),
            });
        }
        let body = stack.pop().unwrap_or_default();
        if directives.is_empty() {
            return Ok(body);
        }
        directives.push(body);
        Ok(format!("({})", directives.join(", ")))
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_double(*f),
        Value::Text(s) => quote(s),
        Value::Date(nanos) => format!("new Date({})", nanos.div_euclid(1_000_000)),
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn variable(variables: &VariableTable, id: VarId) -> String {
    let name = variables.get(id).map_or("", |v| v.name());
    format!("v[{}]", quote(name))
}

fn call(prefix: &str, name: &str, args: &[String]) -> String {
    format!("{prefix}.{name}({})", args.join(", "))
}

fn infix(symbol: &str, args: &[String]) -> String {
    format!("({} {symbol} {})", args[0], args[1])
}

fn render(function: &Function, args: &[String]) -> String {
    let Function::Operator(op) = function else {
        // Alias and ValueSynch pass their operand through
        return match function {
            Function::Alias | Function::ValueSynch => args[0].clone(),
            other => call("Expr", other.name(), args),
        };
    };
    match op {
        Operator::Arith(arith) => match arith {
            ArithOp::Add => infix("+", args),
            ArithOp::Subtract => infix("-", args),
            ArithOp::Multiply => infix("*", args),
            // zero divisors yield +Infinity or NaN, unlike native JS
            ArithOp::Divide | ArithOp::Modulus | ArithOp::IntDivide => {
                call("Expr", arith.name(), args)
            },
            ArithOp::Power => call("Math", "pow", args),
            ArithOp::Negate => format!("(-{})", args[0]),
            ArithOp::Abs => call("Math", "abs", args),
            ArithOp::Sign => call("Math", "sign", args),
            ArithOp::Int => call("Math", "floor", args),
            ArithOp::Fix => call("Math", "trunc", args),
            ArithOp::Min => call("Math", "min", args),
            ArithOp::Max => call("Math", "max", args),
            other => call("Expr", other.name(), args),
        },
        Operator::Compare(cmp) => {
            let symbol = match cmp {
                CompareOp::Equal => "==",
                CompareOp::NotEqual => "!=",
                CompareOp::Less => "<",
                CompareOp::Greater => ">",
                CompareOp::LessOrEqual => "<=",
                CompareOp::GreaterOrEqual => ">=",
            };
            format!("({} {symbol} {} ? -1 : 0)", args[1], args[0])
        },
        Operator::Bit(bit) => match bit {
            BitOp::And => infix("&", args),
            BitOp::Or => infix("|", args),
            BitOp::Xor => infix("^", args),
            BitOp::Not => format!("(~{})", args[0]),
        },
        Operator::Math(math) => {
            let native = match math {
                MathOp::Sin => "sin",
                MathOp::Cos => "cos",
                MathOp::Tan => "tan",
                MathOp::Atn => "atan",
                MathOp::Sqr => "sqrt",
                MathOp::Log => "log",
                MathOp::Log10 => "log10",
                MathOp::Exp => "exp",
                MathOp::Pow => "pow",
                MathOp::Atan2 => "atan2",
            };
            call("Math", native, args)
        },
        Operator::Text(TextOp::Concat) => format!("(String({}) + String({}))", args[0], args[1]),
        Operator::Convert(ConvertOp::If) => {
            format!("({} ? {} : {})", args[0], args[1], args[2])
        },
        other => call("Expr", other.name(), args),
    }
}
