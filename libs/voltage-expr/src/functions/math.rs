//! Transcendental functions (Float results)

use super::{binary, unary, OperatorSet};
use crate::error::Result;
use crate::stack::OperandStack;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Sin,
    Cos,
    Tan,
    Atn,
    Sqr,
    Log,
    Log10,
    Exp,
    Pow,
    Atan2,
}

impl MathOp {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Atn => x.atan(),
            Self::Sqr => x.sqrt(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Exp => x.exp(),
            Self::Pow | Self::Atan2 => f64::NAN,
        }
    }
}

impl OperatorSet for MathOp {
    const ALL: &'static [Self] = &[
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Atn,
        Self::Sqr,
        Self::Log,
        Self::Log10,
        Self::Exp,
        Self::Pow,
        Self::Atan2,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Sin => "Sin",
            Self::Cos => "Cos",
            Self::Tan => "Tan",
            Self::Atn => "Atn",
            Self::Sqr => "Sqr",
            Self::Log => "Log",
            Self::Log10 => "Log10",
            Self::Exp => "Exp",
            Self::Pow => "Pow",
            Self::Atan2 => "Atan2",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Pow | Self::Atan2 => 2,
            _ => 1,
        }
    }

    fn eval(self, stack: &mut OperandStack) -> Result<()> {
        let name = self.name();
        match self {
            Self::Pow => binary(stack, name, |base, exp| {
                Ok(Value::Float(base.as_f64(name)?.powf(exp.as_f64(name)?)))
            }),
            Self::Atan2 => binary(stack, name, |y, x| {
                Ok(Value::Float(y.as_f64(name)?.atan2(x.as_f64(name)?)))
            }),
            _ => unary(stack, name, |x| Ok(Value::Float(self.apply(x.as_f64(name)?)))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::test_support::*;
    use crate::value::Value;

    fn float(name: &str, operands: &[crate::value::TimedValue]) -> f64 {
        match apply(name, operands).unwrap().value {
            Value::Float(f) => f,
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_unary_math() {
        assert_eq!(float("Sqr", &[c(16_i64)]), 4.0);
        assert!(float("Sqr", &[c(-1.0)]).is_nan());
        assert_eq!(float("Log10", &[c(1000.0)]), 3.0);
        assert_eq!(float("Log", &[c(1.0)]), 0.0);
        assert_eq!(float("Exp", &[c(0_i64)]), 1.0);
        assert_eq!(float("Sin", &[c(0.0)]), 0.0);
        assert!(apply("Cos", &[c("x")]).is_err());
    }

    #[test]
    fn test_binary_math() {
        assert_eq!(float("Pow", &[c(3_i64), c(2_i64)]), 9.0);
        let angle = float("Atan2", &[c(1.0), c(1.0)]);
        assert!((angle - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
