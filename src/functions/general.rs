use log::{debug, warn};
use rust_decimal::Decimal;

use super::{Arity, FunctionContainer, FunctionEntry, Invocation, arg};
use crate::{
    collections::{InnerOuterJoin, Where},
    error::{Error, Result, UserError},
    value::Value,
};

/// Control flow, context access and query functions.
pub struct GeneralFunctions;

/// Runs `where(seq, predicate)`; the predicate arrives as source text.
fn filter(args: &[Value], inv: &Invocation<'_>) -> Result<Value> {
    let predicate = inv.evaluator.compile_cached(&arg(args, 1).as_string())?;
    let items = arg(args, 0).clone().into_sequence();

    let filtered = Where::new(items.into_iter(), predicate.tree(), inv.evaluator, inv.context)
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(filtered))
}

/// Runs `innerjoin`/`outerjoin(left, right, predicate)`.
fn join(args: &[Value], inv: &Invocation<'_>, outer: bool) -> Result<Value> {
    let predicate = inv.evaluator.compile_cached(&arg(args, 2).as_string())?;
    let left = arg(args, 0).clone().into_sequence().into_iter();
    let right = arg(args, 1).clone().into_sequence().into_iter();

    let pairs = if outer {
        InnerOuterJoin::outer(left, right, predicate.tree(), inv.evaluator, inv.context)
    } else {
        InnerOuterJoin::inner(left, right, predicate.tree(), inv.evaluator, inv.context)
    };
    Ok(Value::Array(pairs.collect::<Result<Vec<_>>>()?))
}

/// Inclusive numeric range; a step pointing away from `end` yields nothing.
fn number_sequence(start: Decimal, end: Decimal, step: Decimal) -> Vec<Value> {
    let mut items = Vec::new();
    if step.is_zero() || (step.is_sign_positive() && start > end) || (step.is_sign_negative() && start < end) {
        return items;
    }

    let mut current = start;
    while (step.is_sign_positive() && current <= end) || (step.is_sign_negative() && current >= end) {
        items.push(Value::from_decimal(current));
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    items
}

fn document(args: &[Value], inv: &Invocation<'_>) -> Value {
    let repository = arg(args, 0).as_string();
    let name = arg(args, 1).as_string();

    let Some(resolver) = inv.context.documents() else {
        debug!("no document resolver for {}/{}", repository, name);
        return Value::Null;
    };
    match resolver.resolve(&repository, &name) {
        Ok(found) => found.unwrap_or_default(),
        Err(e) => {
            warn!("failed to resolve document {}/{}: {}", repository, name, e);
            Value::Null
        }
    }
}

impl FunctionContainer for GeneralFunctions {
    fn functions(&self) -> Vec<FunctionEntry> {
        let mut functions = vec![
            FunctionEntry::new("iif", Arity::Fixed(3), |args, _| {
                let chosen = if arg(args, 0).as_bool() { 1 } else { 2 };
                Ok(arg(args, chosen).clone())
            }),
            FunctionEntry::new("coalesce", Arity::Variadic, |args, _| {
                let found = args
                    .iter()
                    .find(|v| !v.is_null() && !v.as_string().is_empty())
                    .cloned();
                Ok(found.unwrap_or_default())
            }),
            FunctionEntry::new("_not", Arity::Fixed(1), |args, _| {
                Ok(Value::Boolean(!arg(args, 0).as_bool()))
            }),
            FunctionEntry::new("isnull", Arity::Fixed(1), |args, _| {
                Ok(Value::Boolean(arg(args, 0).is_null()))
            }),
            FunctionEntry::new("isempty", Arity::Fixed(1), |args, _| {
                Ok(Value::Boolean(arg(args, 0).is_empty()))
            }),
            // ========================================
            // Context
            // ========================================
            FunctionEntry::new("position", Arity::Fixed(0), |_, inv| {
                Ok(inv
                    .context
                    .position()
                    .map(|p| Value::from(p as i64))
                    .unwrap_or_default())
            }),
            FunctionEntry::new("name", Arity::Fixed(0), |_, inv| {
                Ok(inv.context.name().map(Value::from).unwrap_or_default())
            }),
            FunctionEntry::new("currentgroup", Arity::Fixed(0), |_, inv| {
                Ok(inv
                    .context
                    .current_group()
                    .map(|group| Value::Array(group.to_vec()))
                    .unwrap_or_default())
            }),
            FunctionEntry::new("errormessage", Arity::Fixed(0), |_, inv| {
                Ok(inv
                    .context
                    .user_error()
                    .map(|e| Value::from(e.message.as_str()))
                    .unwrap_or_default())
            }),
            FunctionEntry::new("errorcode", Arity::Fixed(0), |_, inv| {
                Ok(inv
                    .context
                    .user_error()
                    .and_then(|e| e.code.as_deref())
                    .map(Value::from)
                    .unwrap_or_default())
            }),
            // The repository name is taken as written, never evaluated
            FunctionEntry::new("document", Arity::Fixed(2), |args, inv| Ok(document(args, inv)))
                .with_literal_params(&[0]),
            // ========================================
            // Queries
            // ========================================
            FunctionEntry::new("where", Arity::Fixed(2), filter).with_literal_params(&[1]),
            FunctionEntry::new("innerjoin", Arity::Fixed(3), |args, inv| join(args, inv, false))
                .with_literal_params(&[2]),
            FunctionEntry::new("outerjoin", Arity::Fixed(3), |args, inv| join(args, inv, true))
                .with_literal_params(&[2]),
        ];

        functions.extend(FunctionEntry::overloads("required", &[2, 3], |args, _| {
            let value = arg(args, 0);
            if value.is_null() || value.as_string().trim().is_empty() {
                let code = args.get(2).map(Value::as_string);
                return Err(Error::User(UserError::new(arg(args, 1).as_string(), code)));
            }
            Ok(value.clone())
        }));
        functions.extend(FunctionEntry::overloads("sequence", &[2, 3], |args, _| {
            let (Some(start), Some(end)) = (arg(args, 0).as_decimal(), arg(args, 1).as_decimal()) else {
                return Ok(Value::Array(Vec::new()));
            };
            let step = if args.len() > 2 {
                arg(args, 2).as_decimal().unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ONE
            };
            Ok(Value::Array(number_sequence(start, end, step)))
        }));

        functions
    }
}
