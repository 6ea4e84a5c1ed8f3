//! Tree-walking predicate evaluator

use futures::future::{BoxFuture, FutureExt};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::ast::{ChainStep, Expression, Invocation, Literal, Operator};
use super::cache::{CacheKey, InvocationCache};
use crate::dsl::command::Registry;
use crate::dsl::error::{MemberKind, ScopeError};
use crate::dsl::value::Value;

/// Reduces expressions to values against one registry and one cache.
///
/// Everything is evaluated left to right in a single task, so command side
/// effects are observed in source order and short-circuited operands never
/// run.
pub struct Evaluator<'r> {
    registry: &'r dyn Registry,
    cache: InvocationCache,
    debug: bool,
}

impl<'r> Evaluator<'r> {
    /// Create an evaluator with a fresh cache
    pub fn new(registry: &'r dyn Registry) -> Self {
        Self {
            registry,
            cache: InvocationCache::new(),
            debug: registry.debug(),
        }
    }

    /// Number of distinct command calls made so far
    pub fn cached_calls(&self) -> usize {
        self.cache.len()
    }

    /// Reduce one expression to a value
    pub fn eval<'a>(&'a mut self, expr: &'a Expression) -> BoxFuture<'a, Result<Value, ScopeError>> {
        async move {
            match expr {
                Expression::Literal(literal) => Ok(literal_value(literal)),
                Expression::Sequence(items) => Ok(Value::Array(self.eval_all(items).await?)),
                Expression::Record(entries) => {
                    let mut map = BTreeMap::new();
                    for (key, value) in entries {
                        let value = self.eval(value).await?;
                        map.insert(key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }
                Expression::Invocation(invocation) => self.eval_invocation(invocation).await,
                Expression::Not(inner) => Ok(Value::Bool(!self.eval(inner).await?.truthy())),
            }
        }
        .boxed()
    }

    /// Evaluate to a boolean
    pub async fn check(&mut self, expr: &Expression) -> Result<bool, ScopeError> {
        Ok(self.eval(expr).await?.truthy())
    }

    async fn eval_all(&mut self, items: &[Expression]) -> Result<Vec<Value>, ScopeError> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.eval(item).await?);
        }
        Ok(values)
    }

    async fn eval_invocation(&mut self, invocation: &Invocation) -> Result<Value, ScopeError> {
        let result = match invocation.operator_kind() {
            Some(op) => {
                if !invocation.chain.is_empty() {
                    return Err(ScopeError::invalid(format!(
                        "operator '{}' cannot be followed by a chain",
                        op
                    )));
                }
                self.eval_operator(op, &invocation.args).await?
            }
            None => {
                let value = self.call_command(&invocation.name, &invocation.args).await?;
                self.resolve_chain(value, &invocation.chain).await?
            }
        };

        if invocation.negated {
            Ok(Value::Bool(!result.truthy()))
        } else {
            Ok(result)
        }
    }

    async fn eval_operator(&mut self, op: Operator, args: &[Expression]) -> Result<Value, ScopeError> {
        match op {
            Operator::And => {
                for arg in args {
                    if !self.eval(arg).await?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::Or => {
                for arg in args {
                    if self.eval(arg).await?.truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            _ => {
                let [left, right] = args else {
                    return Err(ScopeError::arity(op.name(), args.len()));
                };
                let left = self.eval(left).await?;
                let right = self.eval(right).await?;
                Ok(Value::Bool(compare(op, &left, &right)))
            }
        }
    }

    async fn call_command(&mut self, name: &str, args: &[Expression]) -> Result<Value, ScopeError> {
        let args = self.eval_all(args).await?;
        self.invoke(name, args).await
    }

    /// Call a command with evaluated arguments, consulting the cache first
    pub(crate) async fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScopeError> {
        let key = CacheKey::new(name, &args);

        if let Some(cached) = self.cache.get(&key) {
            log::trace!("Cache hit for {}", name);
            return Ok(cached.clone());
        }

        let rendered = if self.debug { Some(render_args(&args)) } else { None };
        let result = self.registry.invoke(name, args).await?;

        if let Some(rendered) = rendered {
            log::info!("{}({}) = {}", name, rendered, result);
        }

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Apply property and method steps to a command result. Not cached.
    async fn resolve_chain(&mut self, mut current: Value, chain: &[ChainStep]) -> Result<Value, ScopeError> {
        for step in chain {
            current = match step {
                ChainStep::Property(key) => current.member(key).ok_or_else(|| {
                    ScopeError::unknown_member(MemberKind::Property, key, current.to_string())
                })?,
                ChainStep::Method { name, args } => {
                    let Some(Value::Function(method)) = current.member(name) else {
                        return Err(ScopeError::unknown_member(
                            MemberKind::Method,
                            name,
                            current.to_string(),
                        ));
                    };
                    let args = self.eval_all(args).await?;
                    method
                        .call(args)
                        .await
                        .map_err(|source| ScopeError::command(name, source))?
                }
            };
        }
        Ok(current)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => Value::Number(*n),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Apply a comparison operator to two evaluated operands
pub(crate) fn compare(op: Operator, left: &Value, right: &Value) -> bool {
    match op {
        Operator::Eq => left.deep_eq(right),
        Operator::NotEq => !left.deep_eq(right),
        Operator::Lt => left.compare(right) == Some(Ordering::Less),
        Operator::Lte => matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => left.compare(right) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::And => left.truthy() && right.truthy(),
        Operator::Or => left.truthy() || right.truthy(),
    }
}

fn render_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
