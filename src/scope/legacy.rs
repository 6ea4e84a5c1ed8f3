// SPDX-License-Identifier: MIT

//! Legacy token form
//!
//! Older hosts describe predicates as JSON arrays instead of text:
//!
//! ```json
//! ["editor.hasSelection", "and", ["selection.length", ">", 3], "or", "!readonly"]
//! ```
//!
//! `"or"` and `"and"` tokens split the array into groups. Every remaining part
//! is a command string, a `{command, args, not}` object, a three item
//! `[context, operator, value]` comparison, a `{context, operator, value}`
//! object or a nested array.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value as Json;

use super::condition::ast::Operator;
use super::condition::evaluator::{compare, Evaluator};
use crate::dsl::command::Registry;
use crate::dsl::error::ScopeError;
use crate::dsl::value::Value;

/// Evaluate a legacy token array to a boolean with a fresh invocation cache
pub async fn check_tokens(registry: &dyn Registry, tokens: &Json) -> Result<bool, ScopeError> {
    let mut checker = TokenChecker {
        evaluator: Evaluator::new(registry),
    };
    checker.check(tokens).await
}

/// A command reference decoded from a string or object token
#[derive(Debug, PartialEq)]
struct CommandRef {
    negated: bool,
    name: String,
    args: Vec<Value>,
}

struct TokenChecker<'r> {
    evaluator: Evaluator<'r>,
}

impl<'r> TokenChecker<'r> {
    fn check<'a>(&'a mut self, tokens: &'a Json) -> BoxFuture<'a, Result<bool, ScopeError>> {
        async move {
            let Json::Array(items) = tokens else {
                return Err(ScopeError::invalid(format!(
                    "Unexpected context value: {}",
                    tokens
                )));
            };

            for or_group in split_on(items.iter(), "or") {
                if self.check_and_group(&or_group).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        .boxed()
    }

    async fn check_and_group(&mut self, group: &[&Json]) -> Result<bool, ScopeError> {
        for part in split_on(group.iter().copied(), "and") {
            if !self.check_part(&part).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn check_part(&mut self, part: &[&Json]) -> Result<bool, ScopeError> {
        if let [context, operator, value] = part {
            if is_command(context) && is_command(operator) {
                return self.run_comparison(operator, context, value).await;
            }
        }

        let [token] = part else {
            return Err(invalid_part(part));
        };

        if let Some((context, operator, value)) = object_expression(token) {
            return self.run_comparison(operator, context, value).await;
        }
        if is_command(token) {
            return self.run_command(token).await;
        }
        if token.is_array() {
            return self.check(token).await;
        }
        Err(invalid_part(part))
    }

    async fn run_command(&mut self, token: &Json) -> Result<bool, ScopeError> {
        let command = parse_command(token)?;
        let value = self.evaluator.invoke(&command.name, command.args).await?;
        Ok(value.truthy() != command.negated)
    }

    async fn run_comparison(&mut self, operator: &Json, context: &Json, right: &Json) -> Result<bool, ScopeError> {
        let operator = parse_command(operator)?;
        // Negation only applies on the operator side
        let context = parse_command(context)?;

        let left = self.evaluator.invoke(&context.name, context.args).await?;
        let right = Value::from(right.clone());

        let outcome = match Operator::from_name(&operator.name).filter(|op| !op.is_logical()) {
            Some(op) => compare(op, &left, &right),
            None => {
                let record = Value::record(vec![
                    ("args", Value::Array(operator.args)),
                    ("left", left),
                    ("right", right),
                ]);
                self.evaluator
                    .invoke(&operator.name, vec![record])
                    .await?
                    .truthy()
            }
        };

        Ok(outcome != operator.negated)
    }
}

/// Split on literal separator tokens; `n` separators always give `n + 1` groups
fn split_on<'a>(items: impl Iterator<Item = &'a Json>, separator: &str) -> Vec<Vec<&'a Json>> {
    let mut groups = vec![Vec::new()];
    for item in items {
        if item.as_str() == Some(separator) {
            groups.push(Vec::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(item);
        }
    }
    groups
}

fn is_command(token: &Json) -> bool {
    match token {
        Json::String(_) => true,
        Json::Object(map) => map.contains_key("command") && map.contains_key("args"),
        _ => false,
    }
}

fn object_expression(token: &Json) -> Option<(&Json, &Json, &Json)> {
    let map = token.as_object()?;
    let context = map.get("context").filter(|c| is_command(c))?;
    let operator = map.get("operator").filter(|o| is_command(o))?;
    let value = map.get("value")?;
    Some((context, operator, value))
}

fn invalid_part(part: &[&Json]) -> ScopeError {
    let rendered = serde_json::to_string(part).unwrap_or_default();
    ScopeError::invalid(rendered)
}

fn parse_command(token: &Json) -> Result<CommandRef, ScopeError> {
    match token {
        Json::String(text) => {
            let (text, negated) = strip_negation(text);
            let (name, args) = split_arguments(text)?;
            Ok(CommandRef {
                negated,
                name: name.to_string(),
                args,
            })
        }
        Json::Object(map) => {
            let name = map
                .get("command")
                .and_then(Json::as_str)
                .ok_or_else(|| ScopeError::invalid(format!("Command name must be a string: {}", token)))?;
            let args = match map.get("args") {
                None | Some(Json::Null) => Vec::new(),
                Some(Json::Array(items)) => items.iter().cloned().map(Value::from).collect(),
                Some(other) => vec![Value::from(other.clone())],
            };
            let negated = map.get("not").and_then(Json::as_bool).unwrap_or(false);
            Ok(CommandRef {
                negated,
                name: name.to_string(),
                args,
            })
        }
        other => Err(ScopeError::invalid(format!("Not a command: {}", other))),
    }
}

/// `!==` and `not ==` are negated `==`, but `!=` is an operator of its own
fn strip_negation(text: &str) -> (&str, bool) {
    let trimmed = text.trim();
    if Operator::from_name(trimmed).is_some_and(|op| !op.is_logical()) {
        (trimmed, false)
    } else if let Some(rest) = trimmed.strip_prefix("not ") {
        (rest.trim(), true)
    } else if let Some(rest) = trimmed.strip_prefix('!') {
        (rest.trim(), true)
    } else {
        (trimmed, false)
    }
}

/// `name(a, b)` → (`name`, [a, b]); text without a trailing argument list is all name
fn split_arguments(text: &str) -> Result<(&str, Vec<Value>), ScopeError> {
    let trimmed = text.trim_end();
    let (Some(open), true) = (trimmed.find('('), trimmed.ends_with(')')) else {
        return Ok((text, Vec::new()));
    };

    let name = trimmed[..open].trim();
    let tail = &trimmed[open + 1..trimmed.len() - 1];

    if tail.contains('"') {
        let parsed: Vec<Json> = serde_json::from_str(&format!("[{}]", tail))
            .map_err(|e| ScopeError::argument_parse(tail, format!("invalid JSON: {}", e)))?;
        return Ok((name, parsed.into_iter().map(Value::from).collect()));
    }

    if tail.trim().is_empty() {
        return Ok((name, Vec::new()));
    }

    let args = tail.split(',').map(|arg| coerce_argument(arg.trim())).collect();
    Ok((name, args))
}

fn coerce_argument(arg: &str) -> Value {
    match arg {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) => {
            arg.parse::<f64>().map(Value::Number).unwrap_or_else(|_| Value::from(arg))
        }
        _ => Value::from(arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::command::FnCommand;
    use crate::scope::registry::CommandRegistry;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    async fn registry() -> CommandRegistry {
        let registry = CommandRegistry::new();
        registry
            .register(Arc::new(FnCommand::constant("true", Value::Bool(true))))
            .await;
        registry
            .register(Arc::new(FnCommand::constant("false", Value::Bool(false))))
            .await;
        registry
            .register(Arc::new(FnCommand::constant("zero", Value::from(0i64))))
            .await;
        registry
            .register(Arc::new(FnCommand::new("first", |args| {
                Ok(args.into_iter().next().unwrap_or_default())
            })))
            .await;
        registry
    }

    async fn check(registry: &CommandRegistry, tokens: Json) -> Result<bool, ScopeError> {
        check_tokens(registry, &tokens).await
    }

    #[tokio::test]
    async fn test_single_commands() {
        let registry = registry().await;
        assert!(check(&registry, json!(["true"])).await.unwrap());
        assert!(!check(&registry, json!(["false"])).await.unwrap());
        assert!(check(&registry, json!(["!false"])).await.unwrap());
        assert!(check(&registry, json!(["not false"])).await.unwrap());
        assert!(!check(&registry, json!([{"command": "true", "args": null, "not": true}])).await.unwrap());
    }

    #[tokio::test]
    async fn test_and_or_groups() {
        let registry = registry().await;
        assert!(!check(&registry, json!(["true", "and", "false"])).await.unwrap());
        assert!(check(&registry, json!(["false", "or", "true"])).await.unwrap());
        assert!(check(&registry, json!(["false", "and", "true", "or", "true"])).await.unwrap());
        assert!(check(&registry, json!([["false", "or", "true"], "and", "true"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let registry = registry().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        registry
            .register(Arc::new(FnCommand::new("sideEffect", move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bool(true))
            })))
            .await;

        check(&registry, json!(["false", "and", "sideEffect"])).await.unwrap();
        check(&registry, json!(["true", "or", "sideEffect"])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_comparison_forms() {
        let registry = registry().await;
        assert!(check(&registry, json!([["first(3)", ">", 2]])).await.unwrap());
        assert!(check(&registry, json!(["first(3)", "==", 3])).await.unwrap());
        assert!(check(&registry, json!(["first(3)", "!==", 4])).await.unwrap());
        assert!(check(&registry, json!(["first(3)", "not ==", 4])).await.unwrap());
        assert!(check(&registry, json!(["first(3)", "!=", 4])).await.unwrap());
        assert!(!check(&registry, json!(["first(3)", "!=", 3])).await.unwrap());
        assert!(!check(&registry, json!(["first(3)", "!!=", 4])).await.unwrap());
        assert!(check(
            &registry,
            json!([{"context": "first(\"a\")", "operator": "==", "value": "a"}])
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn test_context_negation_is_ignored() {
        let registry = registry().await;
        assert!(check(&registry, json!(["!zero", "==", 0])).await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_operator_receives_record() {
        let registry = registry().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        registry
            .register(Arc::new(FnCommand::new("between", move |args| {
                let record = args.into_iter().next().unwrap_or_default();
                let json = record.to_json();
                recorder.lock().unwrap().push(json.clone());
                let left = json["left"].as_f64().unwrap_or_default();
                let low = json["args"][0].as_f64().unwrap_or_default();
                let high = json["args"][1].as_f64().unwrap_or_default();
                Ok(Value::Bool(low <= left && left <= high))
            })))
            .await;

        assert!(check(&registry, json!(["first(5)", "between(1, 10)", null])).await.unwrap());
        assert_eq!(
            seen.lock().unwrap()[0],
            json!({"args": [1, 10], "left": 5, "right": null})
        );
    }

    #[tokio::test]
    async fn test_invocation_cache() {
        for (tokens, expected) in [
            (json!([["count", "==", 1], "and", ["count", "==", 1]]), 1),
            (json!([["count(1)", "==", 1], "and", ["count(1)", "==", 1]]), 1),
            (json!([["count(1)", "==", 1], "and", ["count(2)", "==", 2]]), 2),
        ] {
            let registry = registry().await;
            let calls = Arc::new(AtomicUsize::new(0));
            let counted = calls.clone();
            registry
                .register(Arc::new(FnCommand::new("count", move |_| {
                    Ok(Value::from(counted.fetch_add(1, Ordering::SeqCst) + 1))
                })))
                .await;

            assert!(check(&registry, tokens.clone()).await.unwrap(), "{}", tokens);
            assert_eq!(calls.load(Ordering::SeqCst), expected, "{}", tokens);
        }
    }

    #[tokio::test]
    async fn test_unexpected_top_level_value() {
        let registry = registry().await;
        let err = check(&registry, json!("true")).await.unwrap_err();
        assert!(err.to_string().contains("Unexpected context value: \"true\""));
    }

    #[tokio::test]
    async fn test_invalid_part() {
        let registry = registry().await;
        let err = check(&registry, json!(["true", "false"])).await.unwrap_err();
        assert!(matches!(err, ScopeError::InvalidExpression(_)));

        let err = check(&registry, json!([42])).await.unwrap_err();
        assert!(matches!(err, ScopeError::InvalidExpression(_)));
    }

    #[test]
    fn test_strip_negation_keeps_reserved_operators() {
        assert_eq!(strip_negation("!="), ("!=", false));
        assert_eq!(strip_negation(" <= "), ("<=", false));
        assert_eq!(strip_negation("!=="), ("==", true));
        assert_eq!(strip_negation("not >"), (">", true));
        assert_eq!(strip_negation("!editor.readonly"), ("editor.readonly", true));
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(split_arguments("name").unwrap(), ("name", vec![]));
        assert_eq!(split_arguments("name()").unwrap(), ("name", vec![]));
        assert_eq!(
            split_arguments("name(1, true, null, word)").unwrap(),
            (
                "name",
                vec![
                    Value::from(1i64),
                    Value::Bool(true),
                    Value::Null,
                    Value::from("word")
                ]
            )
        );
        assert_eq!(
            split_arguments(r#"name("a,b", {"k": [1]})"#).unwrap(),
            (
                "name",
                vec![Value::from("a,b"), Value::from(json!({"k": [1]}))]
            )
        );
    }

    #[test]
    fn test_split_arguments_bad_json() {
        let err = split_arguments(r#"name("unterminated)"#).unwrap_err();
        assert!(matches!(err, ScopeError::ArgumentParse { .. }));
    }

    #[test]
    fn test_parse_command_object_args() {
        let single = parse_command(&json!({"command": "c", "args": 5})).unwrap();
        assert_eq!(single.args, vec![Value::from(5i64)]);

        let many = parse_command(&json!({"command": "c", "args": [1, 2]})).unwrap();
        assert_eq!(many.args.len(), 2);

        let none = parse_command(&json!({"command": "c", "args": null})).unwrap();
        assert!(none.args.is_empty());
        assert!(!none.negated);
    }
}
