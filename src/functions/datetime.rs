use std::fmt::Write;

use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use super::{Arity, FunctionContainer, FunctionEntry, arg, int_arg};
use crate::{coercion::parse_datetime, error::Error, value::Value};

/// Date and time functions.
///
/// Dates travel as ISO-8601 strings; anything [`parse_datetime`] accepts
/// is valid input and results are written back as
/// `YYYY-MM-DDTHH:MM:SS[.fff]`. Unparseable input yields null.
pub struct DateTimeFunctions;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn datetime_arg(args: &[Value], index: usize) -> Option<NaiveDateTime> {
    parse_datetime(&arg(args, index).as_string())
}

fn format_iso(dt: NaiveDateTime) -> Value {
    Value::String(dt.format(ISO_FORMAT).to_string())
}

/// Whole days since 1900-01-01.
pub fn daydex(dt: NaiveDateTime) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default();
    (dt.date() - epoch).num_days()
}

/// `add*` function that shifts by a (possibly fractional) number of
/// `unit_ms` milliseconds.
fn add_duration(name: &str, unit_ms: f64) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(2), move |args, _| {
        let (Some(dt), Some(amount)) = (datetime_arg(args, 0), arg(args, 1).as_f64()) else {
            return Ok(Value::Null);
        };
        let shifted = TimeDelta::try_milliseconds((amount * unit_ms).round() as i64)
            .and_then(|delta| dt.checked_add_signed(delta));
        Ok(shifted.map(format_iso).unwrap_or_default())
    })
}

fn add_months(dt: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        dt.checked_sub_months(magnitude)
    } else {
        dt.checked_add_months(magnitude)
    }
}

fn component(name: &str, f: fn(&NaiveDateTime) -> i64) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(1), move |args, _| {
        Ok(datetime_arg(args, 0)
            .map(|dt| Value::from(f(&dt)))
            .unwrap_or_default())
    })
}

impl FunctionContainer for DateTimeFunctions {
    fn functions(&self) -> Vec<FunctionEntry> {
        let mut functions = vec![
            FunctionEntry::new("now", Arity::Fixed(0), |_, _| {
                Ok(format_iso(Local::now().naive_local()))
            }),
            FunctionEntry::new("today", Arity::Fixed(0), |_, _| {
                Ok(Value::String(Local::now().date_naive().format("%Y-%m-%d").to_string()))
            }),
            add_duration("adddays", 86_400_000.0),
            add_duration("addhours", 3_600_000.0),
            add_duration("addminutes", 60_000.0),
            add_duration("addseconds", 1_000.0),
            FunctionEntry::new("addmonths", Arity::Fixed(2), |args, _| {
                let (Some(dt), Some(n)) = (datetime_arg(args, 0), int_arg(args, 1)) else {
                    return Ok(Value::Null);
                };
                Ok(add_months(dt, n).map(format_iso).unwrap_or_default())
            }),
            FunctionEntry::new("addyears", Arity::Fixed(2), |args, _| {
                let (Some(dt), Some(n)) = (datetime_arg(args, 0), int_arg(args, 1)) else {
                    return Ok(Value::Null);
                };
                let shifted = n.checked_mul(12).and_then(|months| add_months(dt, months));
                Ok(shifted.map(format_iso).unwrap_or_default())
            }),
            component("year", |dt| i64::from(dt.year())),
            component("month", |dt| i64::from(dt.month())),
            component("day", |dt| i64::from(dt.day())),
            component("hour", |dt| i64::from(dt.hour())),
            component("minute", |dt| i64::from(dt.minute())),
            component("second", |dt| i64::from(dt.second())),
            // Sunday is 0
            component("dayofweek", |dt| i64::from(dt.weekday().num_days_from_sunday())),
            component("dayofyear", |dt| i64::from(dt.ordinal())),
            component("daydex", |dt| daydex(*dt)),
            FunctionEntry::new("formatdate", Arity::Fixed(2), |args, _| {
                let Some(dt) = datetime_arg(args, 0) else {
                    return Ok(Value::Null);
                };
                let format = arg(args, 1).as_string();
                let mut out = String::new();
                write!(out, "{}", dt.format(&format))
                    .map_err(|_| Error::syntax(format!("invalid date format '{}'", format)))?;
                Ok(Value::String(out))
            }),
        ];

        // date(text) keeps the date part; date(y, m, d) builds one
        functions.extend(FunctionEntry::overloads("date", &[1, 3], |args, _| {
            let date = if args.len() == 1 {
                datetime_arg(args, 0).map(|dt| dt.date())
            } else {
                match (int_arg(args, 0), int_arg(args, 1), int_arg(args, 2)) {
                    (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(
                        i32::try_from(y).unwrap_or(i32::MAX),
                        u32::try_from(m).unwrap_or(0),
                        u32::try_from(d).unwrap_or(0),
                    ),
                    _ => None,
                }
            };
            Ok(date
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or_default())
        }));

        functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daydex() {
        let dt = |s: &str| parse_datetime(s).unwrap();
        assert_eq!(daydex(dt("1900-01-01")), 0);
        assert_eq!(daydex(dt("1900-01-31T23:59:59")), 30);
        assert_eq!(daydex(dt("2000-01-01")), 36524);
    }

    #[test]
    fn test_month_arithmetic_clamps_day() {
        let dt = parse_datetime("2024-01-31").unwrap();
        assert_eq!(format_iso(add_months(dt, 1).unwrap()), Value::from("2024-02-29T00:00:00"));
        assert_eq!(format_iso(add_months(dt, -2).unwrap()), Value::from("2023-11-30T00:00:00"));
    }
}
