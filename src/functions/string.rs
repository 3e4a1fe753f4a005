use regex::Regex;

use super::{Arity, FunctionContainer, FunctionEntry, arg, int_arg};
use crate::{error::Error, value::Value};

/// String functions.
///
/// Positions and lengths count characters, not bytes. Out of range
/// positions are clamped rather than treated as errors.
pub struct StringFunctions;

fn text(args: &[Value], index: usize) -> String {
    arg(args, index).as_string()
}

/// Clamped `[start, start + len)` char slice.
fn char_slice(s: &str, start: i64, len: Option<i64>) -> (usize, usize) {
    let count = s.chars().count();
    let start = start.clamp(0, count as i64) as usize;
    let end = match len {
        Some(len) => (start as i64).saturating_add(len.max(0)).min(count as i64) as usize,
        None => count,
    };
    (start, end)
}

fn char_index(haystack: &str, byte_index: Option<usize>) -> Value {
    match byte_index {
        Some(i) => Value::from(haystack[..i].chars().count() as i64),
        None => Value::from(-1i64),
    }
}

/// Widest string `padleft`/`padright` will build.
const MAX_PAD_WIDTH: usize = 1 << 20;

fn pad(args: &[Value], left: bool) -> Value {
    let s = text(args, 0);
    let width = int_arg(args, 1).unwrap_or(0).max(0) as usize;
    if width > MAX_PAD_WIDTH {
        return Value::Null;
    }
    let fill = text(args, 2).chars().next().unwrap_or(' ');

    let missing = width.saturating_sub(s.chars().count());
    let padding: String = std::iter::repeat_n(fill, missing).collect();
    if left {
        Value::String(padding + &s)
    } else {
        Value::String(s + &padding)
    }
}

fn string_fn(name: &str, f: fn(&str) -> String) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(1), move |args, _| {
        Ok(Value::String(f(&text(args, 0))))
    })
}

fn predicate_fn(name: &str, f: fn(&str, &str) -> bool) -> FunctionEntry {
    FunctionEntry::new(name, Arity::Fixed(2), move |args, _| {
        Ok(Value::Boolean(f(&text(args, 0), &text(args, 1))))
    })
}

impl FunctionContainer for StringFunctions {
    fn functions(&self) -> Vec<FunctionEntry> {
        let mut functions = vec![
            // ========================================
            // Case and whitespace
            // ========================================
            string_fn("lowercase", str::to_lowercase),
            string_fn("uppercase", str::to_uppercase),
            string_fn("trim", |s| s.trim().to_string()),
            string_fn("trimstart", |s| s.trim_start().to_string()),
            string_fn("trimend", |s| s.trim_end().to_string()),
            string_fn("normalizespace", |s| {
                s.split_whitespace().collect::<Vec<_>>().join(" ")
            }),
            // ========================================
            // Searching
            // ========================================
            predicate_fn("contains", |s, sub| s.contains(sub)),
            predicate_fn("startswith", |s, prefix| s.starts_with(prefix)),
            predicate_fn("endswith", |s, suffix| s.ends_with(suffix)),
            FunctionEntry::new("indexof", Arity::Fixed(2), |args, _| {
                let s = text(args, 0);
                Ok(char_index(&s, s.find(&text(args, 1))))
            }),
            FunctionEntry::new("lastindexof", Arity::Fixed(2), |args, _| {
                let s = text(args, 0);
                Ok(char_index(&s, s.rfind(&text(args, 1))))
            }),
            FunctionEntry::new("matches", Arity::Fixed(2), |args, _| {
                let pattern = text(args, 1);
                let re = Regex::new(&pattern)
                    .map_err(|e| Error::syntax(format!("invalid regex: {e}")))?;
                Ok(Value::Boolean(re.is_match(&text(args, 0))))
            }),
            FunctionEntry::new("substringbefore", Arity::Fixed(2), |args, _| {
                let s = text(args, 0);
                let found = s.find(&text(args, 1)).map(|i| s[..i].to_string());
                Ok(Value::String(found.unwrap_or_default()))
            }),
            FunctionEntry::new("substringafter", Arity::Fixed(2), |args, _| {
                let s = text(args, 0);
                let sub = text(args, 1);
                let found = s.find(&sub).map(|i| s[i + sub.len()..].to_string());
                Ok(Value::String(found.unwrap_or_default()))
            }),
            // ========================================
            // Building
            // ========================================
            FunctionEntry::new("replace", Arity::Fixed(3), |args, _| {
                let s = text(args, 0);
                let old = text(args, 1);
                if old.is_empty() {
                    return Ok(Value::String(s));
                }
                Ok(Value::String(s.replace(&old, &text(args, 2))))
            }),
            FunctionEntry::new("split", Arity::Fixed(2), |args, _| {
                let s = text(args, 0);
                let delimiter = text(args, 1);
                let parts: Vec<Value> = if delimiter.is_empty() {
                    s.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(delimiter.as_str()).map(Value::from).collect()
                };
                Ok(Value::Array(parts))
            }),
            FunctionEntry::new("concat", Arity::Variadic, |args, _| {
                Ok(Value::String(args.iter().map(Value::as_string).collect()))
            }),
            FunctionEntry::new("length", Arity::Fixed(1), |args, _| {
                let length = match arg(args, 0) {
                    Value::Array(items) => items.len(),
                    other => other.as_string().chars().count(),
                };
                Ok(Value::from(length as i64))
            }),
            // ========================================
            // Conversion
            // ========================================
            FunctionEntry::new("string", Arity::Fixed(1), |args, _| {
                Ok(Value::String(text(args, 0)))
            }),
            FunctionEntry::new("number", Arity::Fixed(1), |args, _| {
                Ok(arg(args, 0)
                    .as_decimal()
                    .map(Value::from_decimal)
                    .unwrap_or_default())
            }),
        ];

        functions.extend(FunctionEntry::overloads("substring", &[2, 3], |args, _| {
            let s = text(args, 0);
            let (start, end) = char_slice(&s, int_arg(args, 1).unwrap_or(0), int_arg(args, 2));
            Ok(Value::String(s.chars().skip(start).take(end - start).collect()))
        }));
        functions.extend(FunctionEntry::overloads("remove", &[2, 3], |args, _| {
            let s = text(args, 0);
            let (start, end) = char_slice(&s, int_arg(args, 1).unwrap_or(0), int_arg(args, 2));
            let kept: String = s
                .chars()
                .enumerate()
                .filter(|(i, _)| *i < start || *i >= end)
                .map(|(_, c)| c)
                .collect();
            Ok(Value::String(kept))
        }));
        functions.extend(FunctionEntry::overloads("padleft", &[2, 3], |args, _| Ok(pad(args, true))));
        functions.extend(FunctionEntry::overloads("padright", &[2, 3], |args, _| Ok(pad(args, false))));

        functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_slice_clamps() {
        assert_eq!(char_slice("hello", 1, Some(3)), (1, 4));
        assert_eq!(char_slice("hello", -2, Some(100)), (0, 5));
        assert_eq!(char_slice("hello", 9, None), (5, 5));
    }

    #[test]
    fn test_char_index_counts_chars() {
        assert_eq!(char_index("héllo", "héllo".find('l')), Value::from(2i64));
        assert_eq!(char_index("abc", None), Value::from(-1i64));
    }
}
