use std::{fmt, str::FromStr, sync::Arc};

use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

/// Ordered record used for JSON objects.
pub type Record = IndexMap<String, Value>;

/// "Get property by name" capability.
///
/// Implemented by [`Record`] and by host adapters that expose foreign
/// structured data to expressions without converting it up front.
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<Value>;
}

impl PropertySource for Record {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// A host object wrapped into a [`Value`].
///
/// Adapters only need to answer property lookups; `keys` is used when the
/// object is converted to JSON.
pub trait DataObject: PropertySource + fmt::Debug + Send + Sync {
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A dynamically-shaped value flowing through expressions.
///
/// Numbers are kept as [`Decimal`] so that `0.1 + 0.2 == 0.3` holds the way
/// transform authors expect.
///
/// # Examples
///
/// ```
/// use reshape_lang::Value;
/// use serde_json::json;
///
/// let v = Value::from(json!({"name": "Alice", "tags": ["a", "b"]}));
/// assert_eq!(v.property("name"), Some(Value::from("Alice")));
/// assert_eq!(v.to_string(), r#"{"name":"Alice","tags":["a","b"]}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,

    Boolean(bool),

    Number(Decimal),

    String(String),

    Array(Vec<Value>),

    Object(Record),

    /// Foreign object exposed through [`DataObject`]
    Host(Arc<dyn DataObject>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Host(a), Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Host(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty string, empty array
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(arr) => arr.is_empty(),
            Value::Object(obj) => obj.is_empty(),
            _ => false,
        }
    }

    /// Looks up a property on records and host objects.
    pub fn property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.property(name),
            Value::Host(host) => host.property(name),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Host(_))
    }

    /// Truthiness used by conditions, `&&`, `||` and predicates.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    true
                } else if s.eq_ignore_ascii_case("false") {
                    false
                } else if let Ok(n) = Decimal::from_str(s) {
                    !n.is_zero()
                } else {
                    !s.is_empty()
                }
            }
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(_) | Value::Host(_) => true,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => Decimal::from_str(s.trim())
                .ok()
                .or_else(|| Decimal::from_scientific(s.trim()).ok()),
            Value::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_decimal().and_then(|d| d.to_f64())
    }

    /// Integer view; fractional numbers are not integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.is_integer() => n.to_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// String form used for concatenation and coercing comparisons.
    ///
    /// Null becomes the empty string; containers render as compact JSON.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Views any value as a sequence: arrays as-is, null as empty, everything
    /// else as a single item.
    pub fn into_sequence(self) -> Vec<Value> {
        match self {
            Value::Array(arr) => arr,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    pub fn from_decimal(n: Decimal) -> Value {
        Value::Number(n.normalize())
    }

    pub fn from_f64(n: f64) -> Value {
        Decimal::from_f64(n)
            .map(Value::from_decimal)
            .unwrap_or(Value::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.is_integer()
                    && let Some(i) = n.to_i64()
                {
                    serde_json::Value::Number(i.into())
                } else {
                    n.to_f64()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Host(host) => serde_json::Value::Object(
                host.keys()
                    .into_iter()
                    .map(|k| {
                        let v = host.property(&k).unwrap_or_default().to_json();
                        (k, v)
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Decimal::from(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Number(Decimal::from(u))
                } else {
                    n.as_f64().map(Value::from_f64).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Record> for Value {
    fn from(obj: Record) -> Self {
        Value::Object(obj)
    }
}
