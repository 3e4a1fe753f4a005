use std::{collections::HashMap, fmt, sync::Arc};

use crate::{error::UserError, value::Value};

/// Named variable scope, optionally chained to an outer scope.
///
/// Hosts build one per `#variable` block; lookups fall back to the outer
/// scope when a name is not declared locally.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Value>,
    outer: Option<Arc<Variables>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, empty scope whose lookups fall back to `outer`.
    pub fn with_outer(outer: Arc<Variables>) -> Self {
        Variables {
            values: HashMap::new(),
            outer: Some(outer),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut vars = Variables::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}

/// Resolves `document(repository, name)` calls.
///
/// Repositories live outside the expression engine; returning `Ok(None)`
/// means the document does not exist and evaluates to null.
pub trait DocumentResolver {
    fn resolve(&self, repository: &str, name: &str) -> Result<Option<Value>, String>;
}

impl<F> DocumentResolver for F
where
    F: Fn(&str, &str) -> Result<Option<Value>, String>,
{
    fn resolve(&self, repository: &str, name: &str) -> Result<Option<Value>, String> {
        self(repository, name)
    }
}

/// Per-step evaluation state.
///
/// Holds the current data plus borrowed, shared state (variables, group,
/// error, resolver). Child contexts are cheap: they borrow their parent,
/// which also gives the ancestor axis (`/name`, `//name`) something to walk.
///
/// # Examples
///
/// ```
/// use reshape_lang::{EvalContext, Evaluator, Value};
/// use serde_json::json;
///
/// let evaluator = Evaluator::new();
/// let expr = evaluator.compile("/Region + ':' + Name").unwrap();
///
/// let order = EvalContext::new(Value::from(json!({"Region": "West"})));
/// let line = order.child(Value::from(json!({"Name": "Widget"})));
/// assert_eq!(evaluator.evaluate(&expr, &line).unwrap(), Value::from("West:Widget"));
/// ```
#[derive(Clone)]
pub struct EvalContext<'a> {
    data: Value,
    parent: Option<&'a EvalContext<'a>>,
    variables: Option<&'a Variables>,
    current_group: Option<&'a [Value]>,
    user_error: Option<&'a UserError>,
    documents: Option<&'a dyn DocumentResolver>,
    position: Option<usize>,
    name: Option<&'a str>,
}

impl<'a> EvalContext<'a> {
    pub fn new(data: Value) -> Self {
        EvalContext {
            data,
            parent: None,
            variables: None,
            current_group: None,
            user_error: None,
            documents: None,
            position: None,
            name: None,
        }
    }

    pub fn with_variables(mut self, variables: &'a Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_group(mut self, group: &'a [Value]) -> Self {
        self.current_group = Some(group);
        self
    }

    pub fn with_user_error(mut self, error: &'a UserError) -> Self {
        self.user_error = Some(error);
        self
    }

    pub fn with_documents(mut self, documents: &'a dyn DocumentResolver) -> Self {
        self.documents = Some(documents);
        self
    }

    /// 1-based position of the current item within its sequence
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Property name the current item was found under
    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Context for `data`, one level below `self`.
    ///
    /// Shared state is inherited; position and name are not.
    pub fn child(&self, data: Value) -> EvalContext<'_> {
        EvalContext {
            data,
            parent: Some(self),
            variables: self.variables,
            current_group: self.current_group,
            user_error: self.user_error,
            documents: self.documents,
            position: None,
            name: None,
        }
    }

    /// Context for the `index`-th (0-based) item of a sequence.
    pub fn item(&self, data: Value, index: usize) -> EvalContext<'_> {
        let mut ctx = self.child(data);
        ctx.position = Some(index + 1);
        ctx
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn parent(&self) -> Option<&EvalContext<'a>> {
        self.parent
    }

    pub fn grandparent(&self) -> Option<&EvalContext<'a>> {
        self.parent.and_then(|p| p.parent)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.and_then(|vars| vars.get(name))
    }

    pub fn current_group(&self) -> Option<&[Value]> {
        self.current_group
    }

    pub fn user_error(&self) -> Option<&UserError> {
        self.user_error
    }

    pub fn documents(&self) -> Option<&dyn DocumentResolver> {
        self.documents
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn name(&self) -> Option<&str> {
        self.name
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("data", &self.data)
            .field("has_parent", &self.parent.is_some())
            .field("position", &self.position)
            .field("name", &self.name)
            .finish()
    }
}
