//! Postfix text form
//!
//! A convenience loader for sequences that are already in postfix order:
//! each item is a literal, a function name or a variable name. There is no
//! infix parsing here.
//!
//! Literals:
//! - `42`, `-7` (Int), `1.5`, `2e3` (Float)
//! - `&hFF` (hex Int), `&b1010` (binary Int)
//! - `"text"` with `""` as an escaped quote
//! - `#2024-03-01 12:00:00#`, `#2024-03-01#` (Date, UTC)

use crate::config::ExpressionConfig;
use crate::date;
use crate::error::{ExprError, Result};
use crate::expression::Expression;
use crate::functions::Function;
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

struct Patterns {
    int: Regex,
    float: Regex,
    hex: Regex,
    binary: Regex,
    identifier: Regex,
}

#[allow(clippy::disallowed_methods)] // literal patterns, always valid
static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    int: Regex::new(r"^[+-]?\d+$").unwrap(),
    float: Regex::new(r"^[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?$").unwrap(),
    hex: Regex::new(r"^&[hH]([0-9A-Fa-f]+)$").unwrap(),
    binary: Regex::new(r"^&[bB]([01]+)$").unwrap(),
    identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\[\]]*$").unwrap(),
});

/// Classify a literal; `Ok(None)` when `item` is not a literal
pub fn parse_literal(item: &str) -> Result<Option<Value>> {
    let p = &*PATTERNS;
    if p.int.is_match(item) {
        return item
            .parse::<i64>()
            .map(|i| Some(Value::Int(i)))
            .map_err(|e| ExprError::parse(item, e.to_string()));
    }
    if p.float.is_match(item) {
        return item
            .parse::<f64>()
            .map(|f| Some(Value::Float(f)))
            .map_err(|e| ExprError::parse(item, e.to_string()));
    }
    if let Some(digits) = p.hex.captures(item).and_then(|c| c.get(1)) {
        return radix(item, digits.as_str(), 16).map(Some);
    }
    if let Some(digits) = p.binary.captures(item).and_then(|c| c.get(1)) {
        return radix(item, digits.as_str(), 2).map(Some);
    }
    if item.len() >= 2 && item.starts_with('"') && item.ends_with('"') {
        let inner = &item[1..item.len() - 1];
        return Ok(Some(Value::Text(inner.replace("\"\"", "\""))));
    }
    if item.len() >= 2 && item.starts_with('#') && item.ends_with('#') {
        let inner = &item[1..item.len() - 1];
        return date::parse(inner)
            .map(|nanos| Some(Value::Date(nanos)))
            .ok_or_else(|| ExprError::parse(item, "invalid date literal"));
    }
    Ok(None)
}

/// Hex and binary literals wrap into i64 (`&hFFFFFFFFFFFFFFFF` is -1)
fn radix(item: &str, digits: &str, base: u32) -> Result<Value> {
    u64::from_str_radix(digits, base)
        .map(|u| Value::Int(u as i64))
        .map_err(|e| ExprError::parse(item, e.to_string()))
}

/// Split postfix source on whitespace, keeping quoted text and `#dates#` whole
pub fn tokenize(source: &str) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut item = String::new();
        match c {
            '"' => {
                item.push(c);
                chars.next();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    item.push(c);
                    if c == '"' {
                        if matches!(chars.peek(), Some((_, '"'))) {
                            item.push('"');
                            chars.next();
                        } else {
                            closed = true;
                            break;
                        }
                    }
                }
                if !closed {
                    return Err(ExprError::parse(&source[start..], "unterminated text literal"));
                }
            },
            '#' => {
                item.push(c);
                chars.next();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    item.push(c);
                    if c == '#' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ExprError::parse(&source[start..], "unterminated date literal"));
                }
            },
            _ => {
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    item.push(c);
                    chars.next();
                }
            },
        }
        items.push(item);
    }
    Ok(items)
}

/// Build and link an expression from postfix items
///
/// # Example
/// ```
/// use voltage_expr::{parse_postfix, ExpressionConfig, Value};
///
/// let mut expr = parse_postfix(&["A", "B", "<"], ExpressionConfig::default())?;
/// expr.set_variable("A", 5_i64, 1)?;
/// expr.set_variable("B", 3_i64, 2)?;
/// // the later operand is the left-hand side: 3 < 5
/// assert_eq!(expr.evaluate_simple()?.value, Value::Int(-1));
/// # Ok::<(), voltage_expr::ExprError>(())
/// ```
pub fn parse_postfix<S: AsRef<str>>(items: &[S], config: ExpressionConfig) -> Result<Expression> {
    let mut expr = Expression::new(config)?;
    for item in items {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        if let Some(value) = parse_literal(item)? {
            expr.push_constant(value);
        } else if Function::from_name(item, expr.config()).is_some() {
            expr.push_function(item)?;
        } else if PATTERNS.identifier.is_match(item) {
            expr.push_variable(item);
        } else {
            return Err(ExprError::parse(
                item,
                "not a literal, function or variable name",
            ));
        }
    }
    expr.link()?;
    Ok(expr)
}

/// Tokenize and load whitespace-separated postfix source
pub fn parse_postfix_str(source: &str, config: ExpressionConfig) -> Result<Expression> {
    parse_postfix(&tokenize(source)?, config)
}
