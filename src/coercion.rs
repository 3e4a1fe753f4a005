//! Operator semantics over dynamically typed values.
//!
//! Comparisons and arithmetic look at what both operands *can be parsed as*
//! rather than at their runtime types, so `'10' > '9'` is a numeric
//! comparison. Coercion never fails: each step falls through to the next
//! and finally to strings.

use std::{cmp::Ordering, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::{ast::BinOp, value::Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parses the date/time shapes transform data commonly carries.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(_) | Value::String(_) => value.as_int(),
        _ => None,
    }
}

/// Booleans are deliberately not numbers here.
fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn bool_of(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Orders two values: integer, then decimal, then boolean, then date-time,
/// then ordinal string comparison. The first kind both sides parse as wins.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    if let (Value::Number(a), Value::Number(b)) = (left, right) {
        return a.cmp(b);
    }

    let a = left.as_string();
    let b = right.as_string();

    if let (Ok(x), Ok(y)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (Decimal::from_str(a.trim()), Decimal::from_str(b.trim())) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (parse_bool(&a), parse_bool(&b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (parse_datetime(&a), parse_datetime(&b)) {
        return x.cmp(&y);
    }
    a.cmp(&b)
}

/// Evaluates a comparison operator.
pub fn apply_comparison(op: BinOp, left: &Value, right: &Value) -> bool {
    let ordering = compare(left, right);
    match op {
        BinOp::Equal => ordering == Ordering::Equal,
        BinOp::NotEqual => ordering != Ordering::Equal,
        BinOp::LessThan => ordering == Ordering::Less,
        BinOp::LessEqual => ordering != Ordering::Greater,
        BinOp::GreaterThan => ordering == Ordering::Greater,
        BinOp::GreaterEqual => ordering != Ordering::Less,
        _ => false,
    }
}

fn integer_math(op: BinOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        // Only exact divisions stay integral
        BinOp::Divide if b != 0 && a.checked_rem(b) == Some(0) => a.checked_div(b),
        BinOp::Modulo if b != 0 => a.checked_rem(b),
        _ => None,
    }
}

fn decimal_math(op: BinOp, a: Decimal, b: Decimal) -> Option<Decimal> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    }
}

/// Evaluates an arithmetic operator.
///
/// Tries integer math, decimal math, boolean math (`+` is AND, `-` is OR)
/// and finally string math (`+` concatenates, `-` removes the first
/// occurrence of the right operand). Anything else is null.
pub fn apply_arithmetic(op: BinOp, left: &Value, right: &Value) -> Value {
    if let (Some(a), Some(b)) = (integer_of(left), integer_of(right))
        && let Some(result) = integer_math(op, a, b)
    {
        return Value::from(result);
    }

    if let (Some(a), Some(b)) = (decimal_of(left), decimal_of(right)) {
        return decimal_math(op, a, b)
            .map(Value::from_decimal)
            .unwrap_or(Value::Null);
    }

    if let (Some(a), Some(b)) = (bool_of(left), bool_of(right)) {
        return match op {
            BinOp::Add => Value::Boolean(a && b),
            BinOp::Subtract => Value::Boolean(a || b),
            _ => Value::Null,
        };
    }

    match op {
        BinOp::Add => Value::String(format!("{}{}", left.as_string(), right.as_string())),
        BinOp::Subtract => {
            let haystack = left.as_string();
            let needle = right.as_string();
            if needle.is_empty() {
                Value::String(haystack)
            } else {
                Value::String(haystack.replacen(&needle, "", 1))
            }
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_numeric_strings_compare_numerically() {
        assert_eq!(compare(&s("10"), &s("9")), Ordering::Greater);
        assert_eq!(compare(&s("10.50"), &s("10.5")), Ordering::Equal);
        assert_eq!(compare(&s("abc"), &s("abd")), Ordering::Less);
    }

    #[test]
    fn test_dates_compare_chronologically() {
        assert_eq!(compare(&s("2024-02-01"), &s("2023-12-31T23:59:59")), Ordering::Greater);
        assert_eq!(compare(&s("01/15/2024"), &s("2024-01-15")), Ordering::Equal);
    }

    #[test]
    fn test_boolean_arithmetic() {
        // `+` is AND, `-` is OR
        assert_eq!(apply_arithmetic(BinOp::Add, &Value::from(true), &Value::from(false)), Value::from(false));
        assert_eq!(apply_arithmetic(BinOp::Subtract, &Value::from(true), &Value::from(false)), Value::from(true));
    }

    #[test]
    fn test_string_removal() {
        assert_eq!(
            apply_arithmetic(BinOp::Subtract, &s("banana"), &s("an")),
            s("bana")
        );
    }

    #[test]
    fn test_inexact_division_is_decimal() {
        let result = apply_arithmetic(BinOp::Divide, &Value::from(7i64), &Value::from(2i64));
        assert_eq!(result, Value::Number(Decimal::new(35, 1)));
        assert_eq!(apply_arithmetic(BinOp::Divide, &Value::from(1i64), &Value::from(0i64)), Value::Null);
    }
}
