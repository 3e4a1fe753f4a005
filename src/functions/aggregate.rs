use std::cmp::Ordering;

use rust_decimal::Decimal;

use super::{Arity, FunctionContainer, FunctionEntry, arg};
use crate::{coercion::compare, collections::Union, error::Error, value::Value};

/// Functions over sequences. A non-array argument is treated as a
/// one-item sequence and null as an empty one.
pub struct AggregateFunctions;

fn sequence(args: &[Value], index: usize) -> Vec<Value> {
    arg(args, index).clone().into_sequence()
}

fn numbers(items: &[Value]) -> impl Iterator<Item = Decimal> + '_ {
    items.iter().filter_map(Value::as_decimal)
}

fn extreme(items: Vec<Value>, wanted: Ordering) -> Value {
    items
        .into_iter()
        .filter(|v| !v.is_null())
        .reduce(|best, v| if compare(&v, &best) == wanted { v } else { best })
        .unwrap_or_default()
}

/// One `sort` key: a dotted path with an optional `asc`/`desc` suffix.
#[derive(Debug, PartialEq)]
struct SortKey {
    path: Vec<String>,
    descending: bool,
}

impl SortKey {
    fn parse(spec: &str) -> SortKey {
        let mut words = spec.split_whitespace();
        let path = words.next().unwrap_or("@");
        let descending = words.next().is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));

        let path = if path == "@" {
            Vec::new()
        } else {
            path.trim_start_matches("@.").split('.').map(str::to_string).collect()
        };
        SortKey { path, descending }
    }

    fn extract(&self, item: &Value) -> Value {
        let mut current = item.clone();
        for segment in &self.path {
            current = current.property(segment).unwrap_or_default();
        }
        current
    }
}

/// Stable multi-key sort.
fn sort_items(mut items: Vec<Value>, keys: &[SortKey]) -> Vec<Value> {
    if keys.is_empty() {
        items.sort_by(compare);
        return items;
    }

    let mut keyed: Vec<(Vec<Value>, Value)> = items
        .into_iter()
        .map(|item| (keys.iter().map(|k| k.extract(&item)).collect(), item))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        for (i, key) in keys.iter().enumerate() {
            let ordering = compare(&a[i], &b[i]);
            let ordering = if key.descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    keyed.into_iter().map(|(_, item)| item).collect()
}

impl FunctionContainer for AggregateFunctions {
    fn functions(&self) -> Vec<FunctionEntry> {
        let mut functions = vec![
            FunctionEntry::new("count", Arity::Fixed(1), |args, _| {
                Ok(Value::from(sequence(args, 0).len() as i64))
            }),
            FunctionEntry::new("sum", Arity::Fixed(1), |args, _| {
                Ok(numbers(&sequence(args, 0))
                    .try_fold(Decimal::ZERO, |total, n| total.checked_add(n))
                    .map(Value::from_decimal)
                    .unwrap_or_default())
            }),
            FunctionEntry::new("avg", Arity::Fixed(1), |args, _| {
                let items = sequence(args, 0);
                let Some((total, count)) = numbers(&items)
                    .try_fold((Decimal::ZERO, 0i64), |(total, count), n| {
                        Some((total.checked_add(n)?, count + 1))
                    })
                else {
                    return Ok(Value::Null);
                };
                if count == 0 {
                    return Ok(Value::Null);
                }
                Ok(total
                    .checked_div(Decimal::from(count))
                    .map(Value::from_decimal)
                    .unwrap_or_default())
            }),
            FunctionEntry::new("min", Arity::Fixed(1), |args, _| {
                Ok(extreme(sequence(args, 0), Ordering::Less))
            }),
            FunctionEntry::new("max", Arity::Fixed(1), |args, _| {
                Ok(extreme(sequence(args, 0), Ordering::Greater))
            }),
            FunctionEntry::new("first", Arity::Fixed(1), |args, _| {
                Ok(sequence(args, 0).into_iter().next().unwrap_or_default())
            }),
            FunctionEntry::new("last", Arity::Fixed(1), |args, _| {
                Ok(sequence(args, 0).pop().unwrap_or_default())
            }),
            FunctionEntry::new("reverse", Arity::Fixed(1), |args, _| {
                let mut items = sequence(args, 0);
                items.reverse();
                Ok(Value::Array(items))
            }),
            FunctionEntry::new("any", Arity::Fixed(1), |args, _| {
                Ok(Value::Boolean(!sequence(args, 0).is_empty()))
            }),
            FunctionEntry::new("distinct", Arity::Fixed(1), |args, _| {
                let mut seen: Vec<Value> = Vec::new();
                for item in sequence(args, 0) {
                    if !seen.contains(&item) {
                        seen.push(item);
                    }
                }
                Ok(Value::Array(seen))
            }),
            FunctionEntry::new("union", Arity::Variadic, |args, _| {
                let sources = args.iter().map(|v| v.clone().into_sequence().into_iter()).collect();
                Ok(Value::Array(Union::new(sources).collect()))
            }),
            // sort(seq, 'Name', 'Age desc', ...)
            FunctionEntry::new("sort", Arity::Variadic, |args, _| {
                let Some((items, keys)) = args.split_first() else {
                    return Err(Error::syntax("Function 'sort' requires a sequence"));
                };
                let keys: Vec<SortKey> = keys.iter().map(|k| SortKey::parse(&k.as_string())).collect();
                Ok(Value::Array(sort_items(items.clone().into_sequence(), &keys)))
            }),
        ];

        functions.extend(FunctionEntry::overloads("join", &[1, 2], |args, _| {
            let separator = if args.len() > 1 { arg(args, 1).as_string() } else { ",".to_string() };
            let parts: Vec<String> = sequence(args, 0).iter().map(Value::as_string).collect();
            Ok(Value::String(parts.join(&separator)))
        }));

        functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(
            SortKey::parse("Customer.Name DESC"),
            SortKey {
                path: vec!["Customer".to_string(), "Name".to_string()],
                descending: true
            }
        );
        assert_eq!(SortKey::parse("@").path, Vec::<String>::new());
    }

    #[test]
    fn test_sort_is_stable() {
        let items = Value::from(json!([
            {"k": 2, "id": "a"},
            {"k": 1, "id": "b"},
            {"k": 2, "id": "c"},
            {"k": 1, "id": "d"}
        ]))
        .into_sequence();

        let sorted = sort_items(items, &[SortKey::parse("k")]);
        let ids: Vec<Value> = sorted.iter().map(|v| v.property("id").unwrap_or_default()).collect();
        assert_eq!(ids, vec![Value::from("b"), Value::from("d"), Value::from("a"), Value::from("c")]);
    }
}
