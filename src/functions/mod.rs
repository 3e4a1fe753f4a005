//! Function registry and the built-in function libraries.
//!
//! Functions are grouped into containers. A container hands the registry a
//! list of [`FunctionEntry`] values; the registry indexes them by normalized
//! name and resolves calls by argument count when a call is evaluated.
//!
//! Resolution order is a configuration order dependency: among entries with
//! the same name, the *last registered* entry with the exact argument count
//! wins, then the last registered variadic entry. Host containers are
//! registered after the built-ins and can therefore shadow them.

use std::{collections::HashMap, fmt, sync::Arc};

use log::trace;
use rust_decimal::prelude::ToPrimitive;

use crate::{
    context::EvalContext,
    error::{Result, SyntaxError},
    evaluator::Evaluator,
    value::Value,
};

pub mod aggregate;
pub mod datetime;
pub mod general;
pub mod math;
pub mod string;

pub use aggregate::AggregateFunctions;
pub use datetime::DateTimeFunctions;
pub use general::GeneralFunctions;
pub use math::MathFunctions;
pub use string::StringFunctions;

/// What a function body sees besides its arguments.
pub struct Invocation<'a> {
    pub evaluator: &'a Evaluator,
    pub context: &'a EvalContext<'a>,
}

pub type Callable = Arc<dyn Fn(&[Value], &Invocation<'_>) -> Result<Value> + Send + Sync>;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Any number of arguments; the body checks what it needs
    Variadic,
}

/// One registered function signature.
#[derive(Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub arity: Arity,
    /// Argument positions passed as source text instead of being evaluated
    pub literal_params: Vec<usize>,
    callable: Callable,
}

impl FunctionEntry {
    pub fn new<F>(name: &str, arity: Arity, body: F) -> Self
    where
        F: Fn(&[Value], &Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        FunctionEntry {
            name: normalize_name(name),
            arity,
            literal_params: Vec::new(),
            callable: Arc::new(body),
        }
    }

    /// One entry per accepted argument count, sharing a body.
    ///
    /// Optional trailing parameters are modelled this way: `round(x)` and
    /// `round(x, places)` are two signatures of the same function.
    pub fn overloads<F>(name: &str, counts: &[usize], body: F) -> Vec<Self>
    where
        F: Fn(&[Value], &Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let callable: Callable = Arc::new(body);
        counts
            .iter()
            .map(|&count| FunctionEntry {
                name: normalize_name(name),
                arity: Arity::Fixed(count),
                literal_params: Vec::new(),
                callable: Arc::clone(&callable),
            })
            .collect()
    }

    pub fn with_literal_params(mut self, positions: &[usize]) -> Self {
        self.literal_params = positions.to_vec();
        self
    }

    pub fn is_literal(&self, position: usize) -> bool {
        self.literal_params.contains(&position)
    }

    pub fn call(&self, args: &[Value], invocation: &Invocation<'_>) -> Result<Value> {
        (self.callable)(args, invocation)
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("literal_params", &self.literal_params)
            .finish()
    }
}

/// A group of functions registered together.
///
/// Host applications implement this to expose their own functions to
/// expressions.
///
/// # Examples
///
/// ```
/// use reshape_lang::{EvalContext, Evaluator, Value};
/// use reshape_lang::functions::{Arity, FunctionContainer, FunctionEntry};
///
/// struct Greetings;
///
/// impl FunctionContainer for Greetings {
///     fn functions(&self) -> Vec<FunctionEntry> {
///         vec![FunctionEntry::new("hello", Arity::Fixed(1), |args, _| {
///             Ok(Value::from(format!("Hello, {}!", args[0].as_string())))
///         })]
///     }
/// }
///
/// let evaluator = Evaluator::builder().with_container(Greetings).build();
/// let expr = evaluator.compile("hello('World')").unwrap();
/// let ctx = EvalContext::new(Value::Null);
/// assert_eq!(evaluator.evaluate(&expr, &ctx).unwrap(), Value::from("Hello, World!"));
/// ```
pub trait FunctionContainer {
    fn functions(&self) -> Vec<FunctionEntry>;
}

/// Lowercases and strips the leading underscores used to dodge reserved
/// names (`_not` registers as `not`).
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches('_').to_lowercase()
}

/// Name to signatures table; read-only once the evaluator is built.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Vec<FunctionEntry>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in libraries.
    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        registry.register(&MathFunctions);
        registry.register(&StringFunctions);
        registry.register(&DateTimeFunctions);
        registry.register(&AggregateFunctions);
        registry.register(&GeneralFunctions);
        registry
    }

    pub fn register(&mut self, container: &dyn FunctionContainer) {
        for entry in container.functions() {
            self.add(entry);
        }
    }

    pub fn add(&mut self, entry: FunctionEntry) {
        let signatures = self.entries.entry(entry.name.clone()).or_default();
        if signatures.iter().any(|e| e.arity == entry.arity) {
            trace!("shadowing function {} ({:?})", entry.name, entry.arity);
        }
        signatures.push(entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Finds the signature a call with `count` arguments binds to.
    pub fn resolve(&self, name: &str, count: usize) -> std::result::Result<&FunctionEntry, SyntaxError> {
        let Some(signatures) = self.entries.get(&normalize_name(name)) else {
            return Err(SyntaxError::new(format!("Unknown function '{}'", name)));
        };

        let exact = signatures
            .iter()
            .rev()
            .find(|e| e.arity == Arity::Fixed(count));
        let entry = exact.or_else(|| signatures.iter().rev().find(|e| e.arity == Arity::Variadic));

        match entry {
            Some(entry) => {
                trace!("resolved {}/{} to {:?}", name, count, entry.arity);
                Ok(entry)
            }
            None => Err(SyntaxError::new(format!(
                "Function '{}' does not take {} argument{}",
                name,
                count,
                if count == 1 { "" } else { "s" }
            ))),
        }
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.entries.len())
            .finish()
    }
}

/// Argument helpers shared by the libraries.
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    static NULL: Value = Value::Null;
    args.get(index).unwrap_or(&NULL)
}

/// Integer argument; missing or non-numeric is `None`.
pub(crate) fn int_arg(args: &[Value], index: usize) -> Option<i64> {
    let value = arg(args, index);
    value
        .as_int()
        .or_else(|| value.as_decimal().and_then(|d| d.trunc().to_i64()))
}
