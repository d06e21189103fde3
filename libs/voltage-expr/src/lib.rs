//! voltage-expr - Streaming postfix expression evaluator for VoltageEMS
//!
//! Evaluates an already-compiled postfix token sequence once per incoming
//! telemetry record. Every operand is a timestamped value; every result
//! carries the newest timestamp of its inputs.
//!
//! # Features
//!
//! - **Value model**: Int, Float, Text and Date (nanoseconds) with legacy
//!   -1/0 booleans and tolerant double comparison
//! - **Function library**: arithmetic, comparison, bitwise, transcendental,
//!   text, conversion and date/time functions
//! - **Stateful functions**: count/time windowed and calendar/flag reset
//!   aggregates, `Integrate`, `RateOfChange`, `Delta`
//! - **Synchronization**: `Alias` / `ValueSynch` link phase aligning
//!   independently sampled variables to a common second
//! - **Cursor directives**: forwarded to a host [`ExpressionHandler`]
//! - **JS export**: [`Expression::format_js`]
//!
//! # Example
//!
//! ```rust
//! use voltage_expr::{parse_postfix_str, ExpressionConfig, Value};
//!
//! // average of the last 3 power samples, in kW
//! let mut expr = parse_postfix_str("P 3 RunningAverage 1000 /", ExpressionConfig::default())?;
//!
//! let mut outputs = Vec::new();
//! for (t, p) in [(1, 1000.0), (2, 2000.0), (3, 3000.0), (4, 4000.0)] {
//!     expr.set_variable("P", p, t)?;
//!     outputs.push(expr.evaluate_simple()?.value);
//! }
//! assert_eq!(outputs.last(), Some(&Value::Float(3.0)));
//! # Ok::<(), voltage_expr::ExprError>(())
//! ```
//!
//! # Stateful functions
//!
//! | Family | Functions | Control operand |
//! |--------|-----------|-----------------|
//! | Position window | `RunningAverage/Max/Min/Median/Total/StdDev` | sample count, `<= 0` all |
//! | Time window | `TimeAverage/Max/Min/Median/Total/StdDev` | range in nanoseconds |
//! | Calendar reset | `ResetAverage/Max/Min/Total/StdDev` | 0 never .. 5 yearly |
//! | Flag reset | `FlagResetAverage/Max/Min/Total/StdDev` | reset flag |
//! | Incremental | `Integrate(value, factor)`, `RateOfChange`, `Delta` | - |

pub mod config;
pub mod date;
pub mod error;
mod evaluator;
pub mod export;
pub mod expression;
pub mod functions;
pub mod handler;
pub mod postfix;
pub mod stack;
pub mod state;
pub mod synch;
pub mod token;
pub mod value;

// Re-exports for convenience
pub use config::ExpressionConfig;
pub use error::{ExprError, Result};
pub use expression::Expression;
pub use functions::Function;
pub use handler::{CursorSettings, CursorStart, ExpressionHandler, NullHandler};
pub use postfix::{parse_literal, parse_postfix, parse_postfix_str, tokenize};
pub use synch::SynchVariable;
pub use token::{Token, VarId, Variable, VariableTable};
pub use value::{compare_doubles, TimedValue, Value, ValueKind, FALSE, TRUE};
