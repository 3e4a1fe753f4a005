//! Lazy, pull-based sequence combinators.
//!
//! Each combinator wraps its sources and does work only when `next()` is
//! called. Those driven by an expression yield `Result<Value>` so an
//! evaluation error surfaces at the item that caused it; collecting into
//! `Result<Vec<_>>` stops at the first error.
//!
//! All of them are single-consumer iterators.

use std::vec;

use crate::{
    ast::Expr,
    context::EvalContext,
    error::Result,
    evaluator::Evaluator,
    value::{Record, Value},
};

/// Yields the source items for which a predicate holds.
///
/// The predicate is evaluated with the item as current data, its 1-based
/// index as `position()`, and the wrapping context as parent.
pub struct Where<'a, I> {
    source: I,
    predicate: &'a Expr,
    evaluator: &'a Evaluator,
    context: &'a EvalContext<'a>,
    index: usize,
}

impl<'a, I> Where<'a, I>
where
    I: Iterator<Item = Value>,
{
    pub fn new(
        source: I,
        predicate: &'a Expr,
        evaluator: &'a Evaluator,
        context: &'a EvalContext<'a>,
    ) -> Self {
        Where {
            source,
            predicate,
            evaluator,
            context,
            index: 0,
        }
    }
}

impl<I> Iterator for Where<'_, I>
where
    I: Iterator<Item = Value>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.source.by_ref() {
            let ctx = self.context.item(item, self.index);
            self.index += 1;

            match self.evaluator.eval_bool(self.predicate, &ctx) {
                Ok(true) => return Some(Ok(ctx.data().clone())),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Nested-loop join of two sequences.
///
/// For every left item the right side is restarted by cloning the pristine
/// right iterator, so the right source only needs to be restartable, not
/// materialized. The predicate sees a `{left, right}` record as current
/// data. In outer mode a left item without any match yields
/// `{left, right: null}` once its right side is exhausted.
pub struct InnerOuterJoin<'a, L, R> {
    left: L,
    right_source: R,
    right: Option<R>,
    current_left: Option<Value>,
    matched: bool,
    outer: bool,
    predicate: &'a Expr,
    evaluator: &'a Evaluator,
    context: &'a EvalContext<'a>,
}

impl<'a, L, R> InnerOuterJoin<'a, L, R>
where
    L: Iterator<Item = Value>,
    R: Iterator<Item = Value> + Clone,
{
    pub fn inner(
        left: L,
        right: R,
        predicate: &'a Expr,
        evaluator: &'a Evaluator,
        context: &'a EvalContext<'a>,
    ) -> Self {
        InnerOuterJoin {
            left,
            right_source: right,
            right: None,
            current_left: None,
            matched: false,
            outer: false,
            predicate,
            evaluator,
            context,
        }
    }

    pub fn outer(
        left: L,
        right: R,
        predicate: &'a Expr,
        evaluator: &'a Evaluator,
        context: &'a EvalContext<'a>,
    ) -> Self {
        let mut join = Self::inner(left, right, predicate, evaluator, context);
        join.outer = true;
        join
    }
}

/// Builds the `{left, right}` record a join predicate is evaluated against.
pub fn join_pair(left: Value, right: Value) -> Value {
    let mut pair = Record::new();
    pair.insert("left".to_string(), left);
    pair.insert("right".to_string(), right);
    Value::Object(pair)
}

impl<L, R> Iterator for InnerOuterJoin<'_, L, R>
where
    L: Iterator<Item = Value>,
    R: Iterator<Item = Value> + Clone,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_left.is_none() {
                self.current_left = Some(self.left.next()?);
                self.right = Some(self.right_source.clone());
                self.matched = false;
            }
            let left = self.current_left.clone().unwrap_or_default();

            match self.right.as_mut().and_then(Iterator::next) {
                Some(right) => {
                    let ctx = self.context.child(join_pair(left, right));
                    match self.evaluator.eval_bool(self.predicate, &ctx) {
                        Ok(true) => {
                            self.matched = true;
                            return Some(Ok(ctx.data().clone()));
                        }
                        Ok(false) => {}
                        Err(e) => return Some(Err(e)),
                    }
                }
                None => {
                    self.current_left = None;
                    if self.outer && !self.matched {
                        return Some(Ok(join_pair(left, Value::Null)));
                    }
                }
            }
        }
    }
}

/// Concatenates sequences in order, moving to the next source only when
/// the current one is exhausted.
pub struct Union<I> {
    sources: vec::IntoIter<I>,
    current: Option<I>,
}

impl<I: Iterator> Union<I> {
    pub fn new(sources: Vec<I>) -> Self {
        Union {
            sources: sources.into_iter(),
            current: None,
        }
    }
}

impl<I: Iterator> Iterator for Union<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            self.current = Some(self.sources.next()?);
        }
    }
}

/// Yields a named field of every parent, flattening array fields and
/// skipping parents where the field is absent or null. Parents that are
/// themselves arrays are descended into.
pub struct ChildValues<'n, I> {
    parents: I,
    field: &'n str,
    nested: Vec<vec::IntoIter<Value>>,
    pending: vec::IntoIter<Value>,
}

impl<'n, I> ChildValues<'n, I>
where
    I: Iterator<Item = Value>,
{
    pub fn new(parents: I, field: &'n str) -> Self {
        ChildValues {
            parents,
            field,
            nested: Vec::new(),
            pending: Vec::new().into_iter(),
        }
    }
}

impl<I> Iterator for ChildValues<'_, I>
where
    I: Iterator<Item = Value>,
{
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            if let Some(child) = self.pending.next() {
                return Some(child);
            }
            let parent = match self.nested.last_mut() {
                Some(inner) => match inner.next() {
                    Some(parent) => parent,
                    None => {
                        self.nested.pop();
                        continue;
                    }
                },
                None => self.parents.next()?,
            };
            if let Value::Array(items) = parent {
                self.nested.push(items.into_iter());
                continue;
            }
            match parent.property(self.field) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(children)) => self.pending = children.into_iter(),
                Some(child) => return Some(child),
            }
        }
    }
}
