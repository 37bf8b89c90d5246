/*
 * filters/math.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Arithmetic filters.
//!
//! Integer arithmetic stays integral and falls back to floats on overflow.
//! Non-numeric input counts as 0; non-numeric arguments are errors.

use super::{FilterRegistry, arg, check_arity, int_arg};
use crate::error::FilterError;
use crate::value::{Number, Value};

type FilterResult = Result<Value, FilterError>;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.register("abs", abs);
    registry.register("ceil", ceil);
    registry.register("floor", floor);
    registry.register("round", round);
    registry.register("plus", plus);
    registry.register("minus", minus);
    registry.register("times", times);
    registry.register("divided_by", divided_by);
    registry.register("modulo", modulo);
    registry.register("at_least", at_least);
    registry.register("at_most", at_most);
}

fn input_number(input: &Value) -> Number {
    input.as_number().unwrap_or(Number::Int(0))
}

fn number_arg(args: &[Value], idx: usize) -> Result<Number, FilterError> {
    let value = arg(args, idx);
    value.as_number().ok_or_else(|| {
        FilterError::InvalidArgument(format!(
            "expected a number, got {} `{}`",
            value.type_name(),
            value.to_output()
        ))
    })
}

fn arithmetic(
    input: &Value,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> FilterResult {
    check_arity(args, 1, 1)?;
    let left = input_number(input);
    let right = number_arg(args, 0)?;
    Ok(match (left, right) {
        (Number::Int(a), Number::Int(b)) => match int_op(a, b) {
            Some(result) => Value::Int(result),
            None => Value::Float(float_op(a as f64, b as f64)),
        },
        (a, b) => Value::Float(float_op(a.as_f64(), b.as_f64())),
    })
}

fn is_zero(n: Number) -> bool {
    match n {
        Number::Int(i) => i == 0,
        Number::Float(f) => f == 0.0,
    }
}

/// Float to integer when it fits, else keep the float.
fn integral(f: f64) -> Value {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

fn abs(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input_number(input) {
        Number::Int(i) => i.checked_abs().map_or(Value::Float((i as f64).abs()), Value::Int),
        Number::Float(f) => Value::Float(f.abs()),
    })
}

fn ceil(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input_number(input) {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => integral(f.ceil()),
    })
}

fn floor(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input_number(input) {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => integral(f.floor()),
    })
}

fn round(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 1)?;
    let digits = int_arg(args, 0)?.unwrap_or(0);
    Ok(match input_number(input) {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) if digits <= 0 => integral(f.round()),
        Number::Float(f) => {
            let scale = 10f64.powi(digits.min(15) as i32);
            Value::Float((f * scale).round() / scale)
        }
    })
}

fn plus(input: &Value, args: &[Value]) -> FilterResult {
    arithmetic(input, args, i64::checked_add, |a, b| a + b)
}

fn minus(input: &Value, args: &[Value]) -> FilterResult {
    arithmetic(input, args, i64::checked_sub, |a, b| a - b)
}

fn times(input: &Value, args: &[Value]) -> FilterResult {
    arithmetic(input, args, i64::checked_mul, |a, b| a * b)
}

/// Integer division floors when both sides are integers.
fn divided_by(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    if is_zero(number_arg(args, 0)?) {
        return Err(FilterError::Message("divided by 0".to_string()));
    }
    arithmetic(
        input,
        args,
        |a, b| {
            let quotient = a.checked_div(b)?;
            if (a % b != 0) && ((a < 0) != (b < 0)) {
                quotient.checked_sub(1)
            } else {
                Some(quotient)
            }
        },
        |a, b| a / b,
    )
}

/// The result takes the sign of the divisor.
fn modulo(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    if is_zero(number_arg(args, 0)?) {
        return Err(FilterError::Message("divided by 0".to_string()));
    }
    arithmetic(
        input,
        args,
        |a, b| {
            let rem = a.checked_rem(b)?;
            if rem != 0 && ((rem < 0) != (b < 0)) {
                Some(rem + b)
            } else {
                Some(rem)
            }
        },
        |a, b| a - b * (a / b).floor(),
    )
}

fn at_least(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let value = input_number(input);
    let bound = number_arg(args, 0)?;
    Ok(Value::from(if value.as_f64() < bound.as_f64() {
        bound
    } else {
        value
    }))
}

fn at_most(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let value = input_number(input);
    let bound = number_arg(args, 0)?;
    Ok(Value::from(if value.as_f64() > bound.as_f64() {
        bound
    } else {
        value
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(plus(&int(4), &[int(2)]).unwrap(), int(6));
        assert_eq!(plus(&Value::from("4"), &[int(2)]).unwrap(), int(6));
        assert_eq!(minus(&int(4), &[Value::Float(0.5)]).unwrap(), Value::Float(3.5));
        assert_eq!(times(&int(3), &[int(4)]).unwrap(), int(12));
        assert_eq!(plus(&Value::Nil, &[int(1)]).unwrap(), int(1));
        assert_eq!(
            plus(&int(i64::MAX), &[int(1)]).unwrap(),
            Value::Float(i64::MAX as f64 + 1.0)
        );
        assert!(plus(&int(1), &[Value::from("x")]).is_err());
        assert!(plus(&int(1), &[]).is_err());
    }

    #[test]
    fn test_division() {
        assert_eq!(divided_by(&int(7), &[int(2)]).unwrap(), int(3));
        assert_eq!(divided_by(&int(-7), &[int(2)]).unwrap(), int(-4));
        assert_eq!(divided_by(&int(7), &[Value::Float(2.0)]).unwrap(), Value::Float(3.5));
        assert!(divided_by(&int(7), &[int(0)]).is_err());
        assert!(divided_by(&int(7), &[Value::Float(0.0)]).is_err());
    }

    #[test]
    fn test_modulo() {
        assert_eq!(modulo(&int(7), &[int(3)]).unwrap(), int(1));
        assert_eq!(modulo(&int(-7), &[int(3)]).unwrap(), int(2));
        assert_eq!(modulo(&int(7), &[int(-3)]).unwrap(), int(-2));
        assert_eq!(modulo(&Value::Float(5.5), &[int(2)]).unwrap(), Value::Float(1.5));
        assert!(modulo(&int(1), &[int(0)]).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(ceil(&Value::Float(1.2), &[]).unwrap(), int(2));
        assert_eq!(floor(&Value::Float(-1.2), &[]).unwrap(), int(-2));
        assert_eq!(round(&Value::Float(2.5), &[]).unwrap(), int(3));
        assert_eq!(
            round(&Value::Float(1.23456), &[int(2)]).unwrap(),
            Value::Float(1.23)
        );
        assert_eq!(abs(&int(-3), &[]).unwrap(), int(3));
        assert_eq!(abs(&Value::from("-2.5"), &[]).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(at_least(&int(3), &[int(5)]).unwrap(), int(5));
        assert_eq!(at_least(&int(7), &[int(5)]).unwrap(), int(7));
        assert_eq!(at_most(&int(7), &[int(5)]).unwrap(), int(5));
    }
}
