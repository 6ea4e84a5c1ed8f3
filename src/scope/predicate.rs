// SPDX-License-Identifier: MIT

//! Public entry points

use std::sync::Arc;

use super::condition::{parse, Evaluator, Expression};
use super::legacy::check_tokens;
use crate::dsl::command::Registry;
use crate::dsl::error::ScopeError;
use crate::dsl::value::Value;

/// Anything a host may hand to [`check`]
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Expression text
    Text(String),
    /// Expression text split over several lines, joined with spaces
    Lines(Vec<String>),
    /// An expression parsed ahead of time
    Parsed(Arc<Expression>),
    /// Legacy JSON token array
    Tokens(serde_json::Value),
}

impl From<&str> for Predicate {
    fn from(text: &str) -> Self {
        Predicate::Text(text.to_string())
    }
}

impl From<String> for Predicate {
    fn from(text: String) -> Self {
        Predicate::Text(text)
    }
}

impl From<Vec<String>> for Predicate {
    fn from(lines: Vec<String>) -> Self {
        Predicate::Lines(lines)
    }
}

impl From<Expression> for Predicate {
    fn from(expr: Expression) -> Self {
        Predicate::Parsed(Arc::new(expr))
    }
}

impl From<Arc<Expression>> for Predicate {
    fn from(expr: Arc<Expression>) -> Self {
        Predicate::Parsed(expr)
    }
}

impl From<serde_json::Value> for Predicate {
    fn from(tokens: serde_json::Value) -> Self {
        Predicate::Tokens(tokens)
    }
}

/// Evaluate an expression with a fresh invocation cache
pub async fn evaluate(registry: &dyn Registry, expr: &Expression) -> Result<Value, ScopeError> {
    Evaluator::new(registry).eval(expr).await
}

/// Parse if needed, evaluate and coerce the result to a boolean.
///
/// Every error propagates; there is no fallback truth value.
pub async fn check(registry: &dyn Registry, predicate: impl Into<Predicate>) -> Result<bool, ScopeError> {
    match predicate.into() {
        Predicate::Text(text) => check_text(registry, &text).await,
        Predicate::Lines(lines) => check_text(registry, &lines.join(" ")).await,
        Predicate::Parsed(expr) => Evaluator::new(registry).check(&expr).await,
        Predicate::Tokens(tokens) => check_tokens(registry, &tokens).await,
    }
}

async fn check_text(registry: &dyn Registry, text: &str) -> Result<bool, ScopeError> {
    let expr = parse(text)?;
    Evaluator::new(registry).check(&expr).await
}
