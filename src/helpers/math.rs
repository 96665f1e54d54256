//! `math.*` helpers and `tofixed`.
//!
//! Arguments are coerced to numbers. A result that is not a number (the
//! square root of a negative, a non-numeric argument) is `undefined`.

use std::f64::consts;

use rust_decimal::prelude::Signed;
use rust_decimal::{Decimal, RoundingStrategy};

use super::{HelperDef, HelperRegistry, arg, int_arg};
use crate::ast::Operator;
use crate::number::{Number, NumericMode};
use crate::operators;
use crate::value::{TypeTag, Value};

type NativeFn = fn(f64) -> f64;
type ExactFn = fn(Decimal) -> Decimal;

/// Largest number of decimal places `tofixed` produces.
const MAX_FIXED_PLACES: i64 = 28;

pub(super) fn register(registry: &mut HelperRegistry) {
    for def in unary_helpers() {
        registry.register(def);
    }

    let constants = [
        ("E", consts::E, "Euler's number"),
        ("LN10", consts::LN_10, "The natural logarithm of 10"),
        ("LN2", consts::LN_2, "The natural logarithm of 2"),
        ("LOG10E", consts::LOG10_E, "The base 10 logarithm of e"),
        ("LOG2E", consts::LOG2_E, "The base 2 logarithm of e"),
        ("PI", consts::PI, "The ratio of a circle's circumference to its diameter"),
        ("SQRT1_2", consts::FRAC_1_SQRT_2, "The square root of 1/2"),
        ("SQRT2", consts::SQRT_2, "The square root of 2"),
    ];
    for (name, value, description) in constants {
        let name = format!("math.{}", name);
        registry.register(
            HelperDef::new(name.as_str())
                .any(move |_, _| Ok(Value::from(value)))
                .meta(&format!("{}()", name), description, description),
        );
    }

    registry.register(
        HelperDef::new("math.pow")
            .on(TypeTag::Number, |ctx, args| {
                let (base, exponent) = (arg(&args, 0).clone(), arg(&args, 1).clone());
                Ok(operators::apply(Operator::Power, vec![base, exponent], ctx.numeric_mode()))
            })
            .coerce(&[TypeTag::Number])
            .handles_decimals()
            .meta(
                "math.pow( $base $exponent )",
                "$base raised to the power of $exponent",
                "Returns $base to the $exponent power, exactly when both are exact.",
            ),
    );

    registry.register(
        HelperDef::new("math.atan2")
            .on(TypeTag::Number, |_, args| {
                let (y, x) = (number_arg(&args, 0), number_arg(&args, 1));
                Ok(native_result(y.atan2(x)))
            })
            .coerce(&[TypeTag::Number])
            .meta(
                "math.atan2( $y $x )",
                "The angle in radians of the point ($x, $y)",
                "Returns the angle from the positive x axis to the point ($x, $y).",
            ),
    );

    registry.register(
        HelperDef::new("math.hypot")
            .any(|_, args| {
                let sum: f64 = numbers(&args).map(|n| n.to_f64().powi(2)).sum();
                Ok(native_result(sum.sqrt()))
            })
            .meta(
                "math.hypot( $number1 $number2 [ ... ] )",
                "The square root of the sum of squares of the arguments",
                "Returns the length of the vector made of the arguments.",
            ),
    );

    registry.register(
        HelperDef::new("math.min")
            .any(|_, args| Ok(extreme(&args, |candidate, best| candidate < best)))
            .handles_decimals()
            .meta(
                "math.min( $numbers_or_array )",
                "The smallest of the numbers given",
                "Takes several numbers, or one array of numbers, and returns the smallest.",
            ),
    );

    registry.register(
        HelperDef::new("math.max")
            .any(|_, args| Ok(extreme(&args, |candidate, best| candidate > best)))
            .handles_decimals()
            .meta(
                "math.max( $numbers_or_array )",
                "The largest of the numbers given",
                "Takes several numbers, or one array of numbers, and returns the largest.",
            ),
    );

    registry.register(
        HelperDef::new("math.sum")
            .any(|ctx, args| {
                let mut total = Value::from(0);
                for item in candidates(&args) {
                    if !item.is_numeric_like() {
                        return Ok(Value::Undefined);
                    }
                    total = operators::apply(Operator::Add, vec![total, item.clone()], ctx.numeric_mode());
                }
                Ok(total)
            })
            .handles_decimals()
            .meta(
                "math.sum( $numbers_or_array )",
                "The total of the numbers given",
                "Adds several numbers, or the items of one array. Any non-numeric item makes \
                 the result undefined.",
            ),
    );

    registry.register(
        HelperDef::new("tofixed")
            .on(TypeTag::Number, |ctx, args| {
                let Value::Number(number) = arg(&args, 0) else {
                    return Ok(Value::Undefined);
                };
                let places = int_arg(&args, 1).unwrap_or(0).clamp(0, MAX_FIXED_PLACES);
                let as_string = arg(&args, 2).is_truthy();
                Ok(to_fixed(*number, places as u32, as_string, ctx.numeric_mode()))
            })
            .coerce(&[TypeTag::Number])
            .handles_decimals()
            .meta(
                "tofixed( $number $precision [ $as_string ] )",
                "The number rounded to $precision decimal places",
                "Rounds the number to $precision digits after the decimal point. With \
                 $as_string the result is a string that always shows exactly that many digits.",
            ),
    );
}

fn unary_helpers() -> Vec<HelperDef> {
    vec![
        unary("abs", f64::abs, Some(|d| d.abs()), "The absolute value of the number"),
        unary("acos", f64::acos, None, "The inverse cosine (in radians) of the number"),
        unary("acosh", f64::acosh, None, "The inverse hyperbolic cosine of the number"),
        unary("asin", f64::asin, None, "The inverse sine (in radians) of the number"),
        unary("asinh", f64::asinh, None, "The inverse hyperbolic sine of the number"),
        unary("atan", f64::atan, None, "The inverse tangent (in radians) of the number"),
        unary("atanh", f64::atanh, None, "The inverse hyperbolic tangent of the number"),
        unary("cbrt", f64::cbrt, None, "The cube root of the number"),
        unary("ceil", f64::ceil, Some(|d| d.ceil()), "The smallest integer not below the number"),
        unary("cos", f64::cos, None, "The cosine of the number (in radians)"),
        unary("cosh", f64::cosh, None, "The hyperbolic cosine of the number"),
        unary("exp", f64::exp, None, "E raised to the power of the number"),
        unary("expm1", f64::exp_m1, None, "E raised to the power of the number, minus 1"),
        unary("floor", f64::floor, Some(|d| d.floor()), "The largest integer not above the number"),
        unary("fround", |x| f64::from(x as f32), None, "The nearest single precision float"),
        unary("log", f64::ln, None, "The natural logarithm of the number"),
        unary("log10", f64::log10, None, "The base 10 logarithm of the number"),
        unary("log1p", f64::ln_1p, None, "The natural logarithm of 1 plus the number"),
        unary("log2", f64::log2, None, "The base 2 logarithm of the number"),
        unary("round", round_half_up, Some(round_decimal_half_up), "The number rounded to the nearest integer"),
        unary("sign", sign, Some(|d| d.signum()), "1, -1 or 0 depending on the sign of the number"),
        unary("sin", f64::sin, None, "The sine of the number (in radians)"),
        unary("sinh", f64::sinh, None, "The hyperbolic sine of the number"),
        unary("sqrt", f64::sqrt, None, "The square root of the number"),
        unary("tan", f64::tan, None, "The tangent of the number (in radians)"),
        unary("tanh", f64::tanh, None, "The hyperbolic tangent of the number"),
        unary("trunc", f64::trunc, Some(|d| d.trunc()), "The integer part of the number"),
    ]
}

/// A one-argument `math.*` helper. Exact decimals go to `exact` when there
/// is one, everything else through `native`.
fn unary(name: &str, native: NativeFn, exact: Option<ExactFn>, returns: &str) -> HelperDef {
    let name = format!("math.{}", name);
    let syntax = format!("{}( $number )", name);
    let def = HelperDef::new(name.as_str())
        .on(TypeTag::Number, move |_, args| {
            Ok(match (arg(&args, 0), exact) {
                (Value::Number(Number::Decimal(d)), Some(exact)) => Value::Number(Number::Decimal(exact(*d))),
                (Value::Number(n), _) => native_result(native(n.to_f64())),
                _ => Value::Undefined,
            })
        })
        .coerce(&[TypeTag::Number])
        .meta(&syntax, returns, &format!("Returns {}.", returns.to_lowercase()));
    if exact.is_some() { def.handles_decimals() } else { def }
}

/// Rounds halves up, toward positive infinity.
fn round_half_up(x: f64) -> f64 {
    if x.fract() == 0.0 { x } else { (x + 0.5).floor() }
}

fn round_decimal_half_up(d: Decimal) -> Decimal {
    d.checked_add(Decimal::new(5, 1)).map_or(d, |shifted| shifted.floor())
}

/// Zero (of either sign) and NaN are their own sign.
fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() { x } else { x.signum() }
}

fn native_result(value: f64) -> Value {
    if value.is_nan() {
        Value::Undefined
    } else {
        Value::Number(Number::from_f64(value))
    }
}

fn number_arg(args: &[Value], index: usize) -> f64 {
    arg(args, index).as_number().map_or(f64::NAN, |n| n.to_f64())
}

/// One array argument supplies the items, otherwise every argument does.
fn candidates(args: &[Value]) -> &[Value] {
    match args {
        [Value::Array(items)] => items,
        _ => args,
    }
}

fn numbers(args: &[Value]) -> impl Iterator<Item = Number> + '_ {
    candidates(args)
        .iter()
        .map(|item| item.as_number().unwrap_or(Number::Float(f64::NAN)))
}

/// The number that wins every comparison, or undefined when there is none
/// or an item is not a number.
fn extreme(args: &[Value], wins: fn(&Number, &Number) -> bool) -> Value {
    let mut best: Option<Number> = None;
    for number in numbers(args) {
        if number.is_nan() {
            return Value::Undefined;
        }
        best = match best {
            Some(current) if !wins(&number, &current) => Some(current),
            _ => Some(number),
        };
    }
    best.map_or(Value::Undefined, Value::Number)
}

fn to_fixed(number: Number, places: u32, as_string: bool, mode: NumericMode) -> Value {
    let exact = match (number, mode) {
        (Number::Decimal(d), _) => Some(d),
        (native, NumericMode::Exact) => native.to_decimal(),
        (_, NumericMode::Native) => None,
    };

    match exact {
        Some(d) => {
            let mut rounded = d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            if as_string {
                rounded.rescale(places);
                Value::String(rounded.to_string())
            } else {
                Value::Number(Number::Decimal(rounded))
            }
        }
        None => {
            let text = format!("{:.*}", places as usize, number.to_f64());
            if as_string {
                Value::String(text)
            } else {
                text.parse::<f64>().map_or(Value::Undefined, native_result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }

    #[test]
    fn test_sign_of_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
    }

    #[test]
    fn test_to_fixed_exact_string() {
        let value = to_fixed(Number::Float(1.005), 2, true, NumericMode::Exact);
        assert_eq!(value, Value::from("1.01"));
        let padded = to_fixed(Number::Integer(3), 2, true, NumericMode::Exact);
        assert_eq!(padded, Value::from("3.00"));
    }

    #[test]
    fn test_extreme_rejects_non_numbers() {
        let args = vec![Value::from(3), Value::from("x")];
        assert_eq!(extreme(&args, |a, b| a < b), Value::Undefined);
        let list = vec![Value::Array(vec![Value::from(3), Value::from(-1), Value::from(2)])];
        assert_eq!(extreme(&list, |a, b| a < b), Value::from(-1));
    }
}
