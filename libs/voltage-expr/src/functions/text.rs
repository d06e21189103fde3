//! Text functions
//!
//! Positions and lengths count characters, not bytes. Non-text operands are
//! rendered with their canonical text form first.

use super::{binary, ternary, unary, OperatorSet};
use crate::error::Result;
use crate::stack::OperandStack;
use crate::value::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Concat,
    Len,
    Left,
    Right,
    Mid,
    UCase,
    LCase,
    Trim,
    InStr,
    Replace,
    StrComp,
}

impl OperatorSet for TextOp {
    const ALL: &'static [Self] = &[
        Self::Concat,
        Self::Len,
        Self::Left,
        Self::Right,
        Self::Mid,
        Self::UCase,
        Self::LCase,
        Self::Trim,
        Self::InStr,
        Self::Replace,
        Self::StrComp,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Concat => "Concat",
            Self::Len => "Len",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Mid => "Mid",
            Self::UCase => "UCase",
            Self::LCase => "LCase",
            Self::Trim => "Trim",
            Self::InStr => "InStr",
            Self::Replace => "Replace",
            Self::StrComp => "StrComp",
        }
    }

    fn symbol(self) -> Option<&'static str> {
        (self == Self::Concat).then_some("&")
    }

    fn arity(self) -> usize {
        match self {
            Self::Len | Self::UCase | Self::LCase | Self::Trim => 1,
            Self::Mid | Self::Replace | Self::StrComp => 3,
            _ => 2,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        match self {
            Self::Concat => binary(stack, name, |a, b| {
                Ok(Value::Text(a.to_text() + &b.to_text()))
            }),
            Self::Len => unary(stack, name, |s| {
                Ok(Value::Int(s.to_text().chars().count() as i64))
            }),
            Self::Left => binary(stack, name, |s, n| {
                let n = count(n.as_i64(name)?);
                Ok(Value::Text(s.to_text().chars().take(n).collect()))
            }),
            Self::Right => binary(stack, name, |s, n| {
                let s = s.to_text();
                let skip = s.chars().count().saturating_sub(count(n.as_i64(name)?));
                Ok(Value::Text(s.chars().skip(skip).collect()))
            }),
            Self::Mid => ternary(stack, name, |s, start, len| {
                let skip = count(start.as_i64(name)?.saturating_sub(1));
                let len = len.as_i64(name)?;
                let text = s.to_text();
                let tail = text.chars().skip(skip);
                Ok(Value::Text(if len < 0 {
                    tail.collect()
                } else {
                    tail.take(count(len)).collect()
                }))
            }),
            Self::UCase => unary(stack, name, |s| Ok(Value::Text(s.to_text().to_uppercase()))),
            Self::LCase => unary(stack, name, |s| Ok(Value::Text(s.to_text().to_lowercase()))),
            Self::Trim => unary(stack, name, |s| Ok(Value::text(s.to_text().trim()))),
            Self::InStr => binary(stack, name, |haystack, needle| {
                let (haystack, needle) = (haystack.to_text(), needle.to_text());
                let position = match haystack.find(&needle) {
                    Some(byte) => haystack[..byte].chars().count() as i64 + 1,
                    None => 0,
                };
                Ok(Value::Int(position))
            }),
            Self::Replace => ternary(stack, name, |s, find, with| {
                let (s, find) = (s.to_text(), find.to_text());
                if find.is_empty() {
                    return Ok(Value::Text(s));
                }
                Ok(Value::Text(s.replace(&find, &with.to_text())))
            }),
            Self::StrComp => ternary(stack, name, |a, b, mode| {
                let (a, b) = (a.to_text(), b.to_text());
                let ordering = match mode.as_i64(name)? {
                    0 => a.cmp(&b),
                    _ => a.to_lowercase().cmp(&b.to_lowercase()),
                };
                Ok(Value::Int(match ordering {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                }))
            }),
        }
    }
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::test_support::*;
    use crate::value::Value;

    fn text(name: &str, operands: &[crate::value::TimedValue]) -> Value {
        apply(name, operands).unwrap().value
    }

    #[test]
    fn test_concat_renders_operands() {
        assert_eq!(text("&", &[c("P="), c(1.5)]), Value::text("P=1.5"));
        assert_eq!(text("Concat", &[c(1_i64), c(2_i64)]), Value::text("12"));
    }

    #[test]
    fn test_substrings_count_characters() {
        assert_eq!(text("Len", &[c("größe")]), Value::Int(5));
        assert_eq!(text("Left", &[c("größe"), c(3_i64)]), Value::text("grö"));
        assert_eq!(text("Right", &[c("größe"), c(2_i64)]), Value::text("ße"));
        assert_eq!(text("Right", &[c("ab"), c(10_i64)]), Value::text("ab"));
        assert_eq!(text("Mid", &[c("abcdef"), c(2_i64), c(3_i64)]), Value::text("bcd"));
        assert_eq!(text("Mid", &[c("abcdef"), c(4_i64), c(-1_i64)]), Value::text("def"));
        assert_eq!(text("Left", &[c("abc"), c(-1_i64)]), Value::text(""));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(text("UCase", &[c("kWh")]), Value::text("KWH"));
        assert_eq!(text("LCase", &[c("kWh")]), Value::text("kwh"));
        assert_eq!(text("Trim", &[c("  a b ")]), Value::text("a b"));
    }

    #[test]
    fn test_search_and_replace() {
        assert_eq!(text("InStr", &[c("ünit-7"), c("-")]), Value::Int(5));
        assert_eq!(text("InStr", &[c("abc"), c("z")]), Value::Int(0));
        assert_eq!(
            text("Replace", &[c("a.b.c"), c("."), c("/")]),
            Value::text("a/b/c")
        );
        assert_eq!(text("Replace", &[c("abc"), c(""), c("x")]), Value::text("abc"));
    }

    #[test]
    fn test_strcomp_modes() {
        assert_eq!(text("StrComp", &[c("a"), c("B"), c(0_i64)]), Value::Int(1));
        assert_eq!(text("StrComp", &[c("a"), c("B"), c(1_i64)]), Value::Int(-1));
        assert_eq!(text("StrComp", &[c("x"), c("X"), c(1_i64)]), Value::Int(0));
    }
}
