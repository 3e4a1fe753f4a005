use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use log::debug;
use rust_decimal::prelude::ToPrimitive;

use crate::{
    ast::{Axis, BinOp, Expr},
    coercion::{apply_arithmetic, apply_comparison},
    collections::{ChildValues, Where},
    compiler,
    context::EvalContext,
    error::{Result, SyntaxError},
    functions::{FunctionContainer, FunctionRegistry, Invocation},
    value::Value,
};

/// A compiled, immutable expression tree together with its source text.
///
/// Cloning is cheap; the tree is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: Arc<str>,
    tree: Arc<Expr>,
}

impl CompiledExpression {
    pub fn new(source: &str, tree: Expr) -> Self {
        CompiledExpression {
            source: Arc::from(source),
            tree: Arc::new(tree),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Whether two handles share the same tree.
    pub fn ptr_eq(&self, other: &CompiledExpression) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Configures an [`Evaluator`].
///
/// # Examples
///
/// ```
/// use reshape_lang::Evaluator;
///
/// let evaluator = Evaluator::builder().with_builtins(false).with_cache(false).build();
/// assert!(evaluator.functions().names().is_empty());
/// ```
pub struct EvaluatorBuilder {
    builtins: bool,
    cache: bool,
    containers: Vec<Box<dyn FunctionContainer>>,
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        EvaluatorBuilder {
            builtins: true,
            cache: true,
            containers: Vec::new(),
        }
    }
}

impl EvaluatorBuilder {
    /// Register the built-in function libraries (default: on).
    pub fn with_builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    /// Memoize compiled expressions by source text (default: on).
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Adds a host function container. Containers are registered after the
    /// built-ins, in the order given, so later ones shadow earlier ones.
    pub fn with_container(mut self, container: impl FunctionContainer + 'static) -> Self {
        self.containers.push(Box::new(container));
        self
    }

    pub fn build(self) -> Evaluator {
        let mut functions = if self.builtins {
            FunctionRegistry::with_builtins()
        } else {
            FunctionRegistry::new()
        };
        for container in &self.containers {
            functions.register(container.as_ref());
        }

        Evaluator {
            functions,
            cache: self.cache.then(|| RwLock::new(HashMap::new())),
        }
    }
}

/// Compiles and evaluates expressions.
///
/// An `Evaluator` is read-only after construction (apart from its internal
/// compile cache) and can be shared across threads; every evaluation gets
/// its own [`EvalContext`].
///
/// # Examples
///
/// ```
/// use reshape_lang::{EvalContext, Evaluator, Value};
/// use serde_json::json;
///
/// let evaluator = Evaluator::new();
/// let expr = evaluator.compile_cached("FirstName + ' ' + LastName").unwrap();
///
/// let ctx = EvalContext::new(Value::from(json!({"FirstName": "Ada", "LastName": "Lovelace"})));
/// assert_eq!(evaluator.evaluate(&expr, &ctx).unwrap(), Value::from("Ada Lovelace"));
/// ```
pub struct Evaluator {
    functions: FunctionRegistry,
    cache: Option<RwLock<HashMap<String, CompiledExpression>>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("functions", &self.functions)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl Evaluator {
    /// Evaluator with the built-in functions and compile caching.
    pub fn new() -> Self {
        EvaluatorBuilder::default().build()
    }

    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::default()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Compiles expression text without consulting the cache.
    pub fn compile(&self, text: &str) -> std::result::Result<CompiledExpression, SyntaxError> {
        debug!("compiling expression: {}", text);
        Ok(CompiledExpression::new(text, compiler::compile(text)?))
    }

    /// Compiles expression text, reusing an earlier compilation of the same
    /// text when caching is enabled.
    pub fn compile_cached(&self, text: &str) -> std::result::Result<CompiledExpression, SyntaxError> {
        let Some(cache) = &self.cache else {
            return self.compile(text);
        };

        if let Some(hit) = cache.read().ok().and_then(|c| c.get(text).cloned()) {
            return Ok(hit);
        }

        debug!("expression cache miss");
        let compiled = self.compile(text)?;
        if let Ok(mut c) = cache.write() {
            // Another thread may have won the race; keep its tree
            return Ok(c.entry(text.to_string()).or_insert(compiled).clone());
        }
        Ok(compiled)
    }

    pub fn evaluate(&self, expr: &CompiledExpression, ctx: &EvalContext<'_>) -> Result<Value> {
        self.eval_expr(expr.tree(), ctx)
    }

    pub fn evaluate_to_bool(&self, expr: &CompiledExpression, ctx: &EvalContext<'_>) -> Result<bool> {
        self.eval_bool(expr.tree(), ctx)
    }

    /// Evaluates a tree node against a context.
    pub fn eval_expr(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Current => Ok(ctx.data().clone()),
            Expr::DataPath { name, axis } => Ok(self.eval_data_path(name, *axis, ctx)),
            Expr::Variable(name) => Ok(ctx.variable(name).cloned().unwrap_or_default()),
            Expr::MultiPartPath(parts) => self.eval_path(parts, ctx),
            // A bare indexer applies to the current data
            Expr::Indexer(inner) => self.apply_indexer(ctx.data().clone(), inner, ctx),
            Expr::FunctionCall { name, args } => self.eval_call(name, args, ctx),
            Expr::BinaryOp { op, left, right } => self.eval_binop(*op, left, right, ctx),
            Expr::Tertiary {
                condition,
                if_true,
                if_false,
            } => {
                if self.eval_bool(condition, ctx)? {
                    self.eval_expr(if_true, ctx)
                } else {
                    self.eval_expr(if_false, ctx)
                }
            }
        }
    }

    /// Evaluates a tree node as a condition.
    pub fn eval_bool(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool> {
        match expr {
            Expr::BinaryOp { op, left, right } if op.is_logical() => {
                self.eval_logical(*op, left, right, ctx)
            }
            Expr::BinaryOp { op, left, right } if op.is_comparison() => {
                let left = self.eval_expr(left, ctx)?;
                let right = self.eval_expr(right, ctx)?;
                Ok(apply_comparison(*op, &left, &right))
            }
            _ => Ok(self.eval_expr(expr, ctx)?.as_bool()),
        }
    }

    fn eval_logical(&self, op: BinOp, left: &Expr, right: &Expr, ctx: &EvalContext<'_>) -> Result<bool> {
        let left = self.eval_bool(left, ctx)?;
        match op {
            BinOp::And if !left => Ok(false),
            BinOp::Or if left => Ok(true),
            _ => self.eval_bool(right, ctx),
        }
    }

    fn eval_binop(&self, op: BinOp, left: &Expr, right: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
        if op.is_logical() {
            return Ok(Value::Boolean(self.eval_logical(op, left, right, ctx)?));
        }

        let left = self.eval_expr(left, ctx)?;
        let right = self.eval_expr(right, ctx)?;

        if op.is_comparison() {
            Ok(Value::Boolean(apply_comparison(op, &left, &right)))
        } else {
            Ok(apply_arithmetic(op, &left, &right))
        }
    }

    fn eval_data_path(&self, name: &str, axis: Axis, ctx: &EvalContext<'_>) -> Value {
        let frame = match axis {
            Axis::Current => Some(ctx),
            Axis::Parent => ctx.parent(),
            Axis::Grandparent => ctx.grandparent(),
        };
        match frame {
            Some(frame) => property_of(frame.data(), name),
            None => Value::Null,
        }
    }

    fn eval_call(&self, name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value> {
        let entry = self.functions.resolve(name, args.len())?;

        let values = args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if entry.is_literal(i) {
                    Ok(Value::String(arg.source_text()))
                } else {
                    self.eval_expr(arg, ctx)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let invocation = Invocation {
            evaluator: self,
            context: ctx,
        };
        entry.call(&values, &invocation)
    }

    /// Threads the current data through the parts of a path.
    ///
    /// Null ends the path. An array is mapped across the next part and the
    /// results flattened, unless the next part is an indexer, which gets the
    /// whole array.
    fn eval_path(&self, parts: &[Expr], ctx: &EvalContext<'_>) -> Result<Value> {
        let Some((first, rest)) = parts.split_first() else {
            return Ok(Value::Null);
        };

        let mut current = self.eval_expr(first, ctx)?;
        for part in rest {
            current = match (current, part) {
                (Value::Null, _) => return Ok(Value::Null),
                (target, Expr::Indexer(inner)) => self.apply_indexer(target, inner, ctx)?,
                (Value::Array(items), Expr::DataPath { name, axis: Axis::Current }) => {
                    Value::Array(ChildValues::new(items.into_iter(), name).collect())
                }
                (Value::Array(items), part) => {
                    let mut flattened = Vec::new();
                    for (index, item) in items.into_iter().enumerate() {
                        if item.is_null() {
                            continue;
                        }
                        match self.eval_expr(part, &ctx.item(item, index))? {
                            Value::Array(values) => flattened.extend(values),
                            Value::Null => {}
                            value => flattened.push(value),
                        }
                    }
                    Value::Array(flattened)
                }
                (target, Expr::DataPath { name, axis: Axis::Current }) => property_of(&target, name),
                (target, part) => self.eval_expr(part, &ctx.child(target))?,
            };
        }
        Ok(current)
    }

    /// Applies `[inner]` to `target`.
    ///
    /// The inner expression is first evaluated in the enclosing context: an
    /// integer indexes an array, a string or number names a property of a
    /// record. Anything else makes it a predicate, evaluated per element
    /// for arrays and against the value itself otherwise.
    fn apply_indexer(&self, target: Value, inner: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
        if target.is_null() {
            return Ok(Value::Null);
        }

        // Errors here are re-raised by the predicate pass if they are real
        let key = self.eval_expr(inner, ctx).ok();

        match (&target, &key) {
            (Value::Array(items), Some(Value::Number(n))) if n.is_integer() => {
                Ok(n.to_i64().map(|i| element_at(items, i)).unwrap_or_default())
            }
            (record, Some(Value::String(name))) if record.is_record() => Ok(property_of(record, name)),
            (record, Some(Value::Number(n))) if record.is_record() => {
                Ok(property_of(record, &n.normalize().to_string()))
            }
            (Value::Array(items), _) => {
                let filtered = Where::new(items.iter().cloned(), inner, self, ctx)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(filtered))
            }
            _ => {
                let item = ctx.child(target.clone());
                if self.eval_bool(inner, &item)? {
                    Ok(item.data().clone())
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }
}

/// Property lookup; arrays map the lookup over their elements.
fn property_of(data: &Value, name: &str) -> Value {
    match data {
        Value::Array(items) => Value::Array(ChildValues::new(items.iter().cloned(), name).collect()),
        other => other.property(name).unwrap_or_default(),
    }
}

/// Element by position; negative positions count from the end.
fn element_at(items: &[Value], index: i64) -> Value {
    let position = if index < 0 {
        let from_end = index.unsigned_abs() as usize;
        if from_end > items.len() {
            return Value::Null;
        }
        items.len() - from_end
    } else {
        index as usize
    };
    items.get(position).cloned().unwrap_or_default()
}
