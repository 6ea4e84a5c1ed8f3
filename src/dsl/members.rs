// SPDX-License-Identifier: MIT

//! Built-in members of primitive values
//!
//! Command results are often plain strings or lists (`precedingText()`,
//! `selections()`), so chains like `precedingText().endsWith("(")` need a
//! small standard set of members on those values.

use super::error::BoxError;
use super::value::Value;

fn string_arg(args: &[Value], index: usize, method: &str) -> Result<String, BoxError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(format!("{}() expects an argument", method).into()),
    }
}

/// Members available on string values
pub fn string_member(s: &str, key: &str) -> Option<Value> {
    let owned = s.to_string();
    let value = match key {
        "length" => Value::from(s.chars().count()),
        "includes" => Value::function(move |args| {
            let needle = string_arg(&args, 0, "includes")?;
            Ok(Value::Bool(owned.contains(&needle)))
        }),
        "startsWith" => Value::function(move |args| {
            let prefix = string_arg(&args, 0, "startsWith")?;
            Ok(Value::Bool(owned.starts_with(&prefix)))
        }),
        "endsWith" => Value::function(move |args| {
            let suffix = string_arg(&args, 0, "endsWith")?;
            Ok(Value::Bool(owned.ends_with(&suffix)))
        }),
        "indexOf" => Value::function(move |args| {
            let needle = string_arg(&args, 0, "indexOf")?;
            Ok(match owned.find(&needle) {
                Some(byte) => Value::from(owned[..byte].chars().count()),
                None => Value::Number(-1.0),
            })
        }),
        "trim" => Value::function(move |_| Ok(Value::from(owned.trim()))),
        "toLowerCase" => Value::function(move |_| Ok(Value::from(owned.to_lowercase()))),
        "toUpperCase" => Value::function(move |_| Ok(Value::from(owned.to_uppercase()))),
        _ => return None,
    };
    Some(value)
}

/// Members available on list values
pub fn array_member(items: &[Value], key: &str) -> Option<Value> {
    let owned = items.to_vec();
    let value = match key {
        "length" => Value::from(items.len()),
        "includes" => Value::function(move |args| {
            let needle = args.into_iter().next().unwrap_or_default();
            Ok(Value::Bool(owned.iter().any(|item| item.deep_eq(&needle))))
        }),
        "indexOf" => Value::function(move |args| {
            let needle = args.into_iter().next().unwrap_or_default();
            Ok(match owned.iter().position(|item| item.deep_eq(&needle)) {
                Some(index) => Value::from(index),
                None => Value::Number(-1.0),
            })
        }),
        "join" => Value::function(move |args| {
            let separator = match args.first() {
                Some(Value::String(s)) => s.clone(),
                _ => ",".to_string(),
            };
            let parts: Vec<String> = owned
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect();
            Ok(Value::from(parts.join(&separator)))
        }),
        _ => return None,
    };
    Some(value)
}
