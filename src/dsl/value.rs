// SPDX-License-Identifier: MIT

//! Runtime values produced by commands and consumed by the evaluator

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::error::BoxError;
use super::members;

/// Something a chain step can call: a record member, a handle method or a
/// built-in member of a primitive value.
#[async_trait]
pub trait Callable: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, BoxError>;
}

/// Opaque host object exposing members by name.
///
/// Methods are members whose value is a [`Value::Function`].
pub trait Object: Send + Sync {
    /// Short type label used when rendering the handle in messages
    fn type_name(&self) -> &str;

    /// Look up a property or method
    fn member(&self, key: &str) -> Option<Value>;
}

/// A dynamically typed runtime value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Function(Arc<dyn Callable>),
    Handle(Arc<dyn Object>),
}

struct SyncFn<F>(F);

#[async_trait]
impl<F> Callable for SyncFn<F>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        (self.0)(args)
    }
}

struct AsyncFn<F>(F);

#[async_trait]
impl<F> Callable for AsyncFn<F>
where
    F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        (self.0)(args).await
    }
}

pub(crate) fn sync_callable<F>(f: F) -> Arc<dyn Callable>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(SyncFn(f))
}

pub(crate) fn async_callable<F, Fut>(f: F) -> Arc<dyn Callable>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    Arc::new(AsyncFn(move |args| {
        Box::pin(f(args)) as BoxFuture<'static, Result<Value, BoxError>>
    }))
}

impl Value {
    /// Wrap a synchronous closure as a callable value
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Value::Function(sync_callable(f))
    }

    /// Wrap an async closure as a callable value
    pub fn async_function<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Value::Function(async_callable(f))
    }

    /// Wrap a host object as a handle
    pub fn handle(object: impl Object + 'static) -> Self {
        Value::Handle(Arc::new(object))
    }

    /// Build a record from key/value pairs
    pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Boolean coercion: null, false, 0, NaN and "" are falsy
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Handle(_) => true,
        }
    }

    /// Deep structural equality.
    ///
    /// Types must match; functions and handles compare by identity.
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.deep_eq(other)))
            }
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Handle(a), Value::Handle(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Ordering used by `<`, `<=`, `>` and `>=`.
    ///
    /// Two strings compare lexicographically, anything else is coerced to a
    /// number. `None` means the operands are unordered and every ordering
    /// comparison is false.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Value::String(a), Value::String(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        let a = self.to_number()?;
        let b = other.to_number()?;
        a.partial_cmp(&b)
    }

    fn to_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Look up a member for a chain step
    pub fn member(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.get(key).cloned(),
            Value::Handle(object) => object.member(key),
            Value::String(s) => members::string_member(s, key),
            Value::Array(items) => members::array_member(items, key),
            _ => None,
        }
    }

    /// Append a canonical, type-distinguishing rendering used for cache keys
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::String(s) => push_quoted(out, s),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_canonical(out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_quoted(out, k);
                    out.push(':');
                    v.write_canonical(out);
                }
                out.push('}');
            }
            Value::Function(f) => {
                out.push_str(&format!("#fn@{:p}", Arc::as_ptr(f) as *const ()));
            }
            Value::Handle(h) => {
                out.push_str(&format!("#obj@{:p}", Arc::as_ptr(h) as *const ()));
            }
        }
    }

    /// Convert to JSON; functions and handles become descriptive strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(|num| {
                    if n.fract() == 0.0 && n.abs() < 9.0e15 {
                        serde_json::Value::from(*n as i64)
                    } else {
                        serde_json::Value::Number(num)
                    }
                })
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(_) | Value::Handle(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n == 0.0 {
        // 0 and -0 are equal, so they must share a key
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn push_quoted(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => {
                let mut out = String::new();
                push_quoted(&mut out, s);
                write!(f, "{}", out)
            }
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    let mut key = String::new();
                    push_quoted(&mut key, k);
                    write!(f, "{}:{}", key, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "[function]"),
            Value::Handle(h) => write!(f, "[{}]", h.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Structural equality, see [`Value::deep_eq`]
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
