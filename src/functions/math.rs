use std::cmp::Ordering;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use super::{Arity, FunctionContainer, FunctionEntry, arg, int_arg};
use crate::{coercion::compare, value::Value};

/// Numeric functions.
///
/// Exact operations (`floor`, `round`, `abs`, ...) stay in decimal;
/// transcendental ones go through `f64`. Non-numeric input yields null.
pub struct MathFunctions;

/// Applies an `f64` function to the first argument.
fn float_fn(name: &str, f: fn(f64) -> f64) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(1), move |args, _| {
        Ok(arg(args, 0)
            .as_f64()
            .map(|x| Value::from_f64(f(x)))
            .unwrap_or_default())
    })
}

/// Applies an exact decimal function to the first argument.
fn decimal_fn(name: &str, f: fn(Decimal) -> Decimal) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(1), move |args, _| {
        Ok(arg(args, 0)
            .as_decimal()
            .map(|x| Value::from_decimal(f(x)))
            .unwrap_or_default())
    })
}

fn pick(args: &[Value], wanted: Ordering) -> Value {
    let (a, b) = (arg(args, 0), arg(args, 1));
    if compare(a, b) == wanted {
        a.clone()
    } else {
        b.clone()
    }
}

impl FunctionContainer for MathFunctions {
    fn functions(&self) -> Vec<FunctionEntry> {
        let mut functions = vec![
            decimal_fn("floor", |x| x.floor()),
            decimal_fn("ceiling", |x| x.ceil()),
            decimal_fn("abs", |x| x.abs()),
            float_fn("sqrt", f64::sqrt),
            float_fn("sin", f64::sin),
            float_fn("cos", f64::cos),
            float_fn("tan", f64::tan),
            float_fn("asin", f64::asin),
            float_fn("acos", f64::acos),
            float_fn("atan", f64::atan),
            float_fn("log", f64::ln),
            float_fn("log10", f64::log10),
            float_fn("exp", f64::exp),
            FunctionEntry::new("pi", Arity::Fixed(0), |_, _| {
                Ok(Value::from_f64(std::f64::consts::PI))
            }),
            FunctionEntry::new("pow", Arity::Fixed(2), |args, _| {
                let (Some(x), Some(y)) = (arg(args, 0).as_f64(), arg(args, 1).as_f64()) else {
                    return Ok(Value::Null);
                };
                Ok(Value::from_f64(x.powf(y)))
            }),
            // Two-value forms; the sequence forms live with the aggregates
            FunctionEntry::new("min", Arity::Fixed(2), |args, _| Ok(pick(args, Ordering::Less))),
            FunctionEntry::new("max", Arity::Fixed(2), |args, _| Ok(pick(args, Ordering::Greater))),
            // Number of digits after the decimal point
            FunctionEntry::new("precision", Arity::Fixed(1), |args, _| {
                Ok(arg(args, 0)
                    .as_decimal()
                    .map(|x| Value::from(i64::from(x.normalize().scale())))
                    .unwrap_or_default())
            }),
        ];

        // Midpoints round away from zero: round(2.5) is 3
        functions.extend(FunctionEntry::overloads("round", &[1, 2], |args, _| {
            let Some(x) = arg(args, 0).as_decimal() else {
                return Ok(Value::Null);
            };
            let places = int_arg(args, 1)
                .unwrap_or(0)
                .clamp(0, 28)
                .to_u32()
                .unwrap_or(0);
            Ok(Value::from_decimal(
                x.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
            ))
        }));

        functions
    }
}
