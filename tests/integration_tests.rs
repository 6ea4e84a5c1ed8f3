//! Integration tests for predicate parsing and evaluation
//!
//! These tests drive the public API end to end with mock commands.

use async_trait::async_trait;
use scope_rs::dsl::error::BoxError;
use scope_rs::scope::condition::{parse, Evaluator};
use scope_rs::scope::environment::{EnvironmentBuilder, EnvironmentLoader, Extension};
use scope_rs::{check, evaluate, Command, CommandRegistry, FnCommand, Predicate, Registry, ScopeError, Value};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Components
// ============================================================================

/// Mock command that counts its invocations and returns the running total
struct CountingCommand {
    name: String,
    calls: Arc<AtomicUsize>,
}

impl CountingCommand {
    fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name: name.to_string(),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Command for CountingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _args: Vec<Value>) -> Result<Value, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Value::from(n))
    }
}

/// Mock command that records the order in which it was invoked
struct RecordingCommand {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    result: Value,
}

#[async_trait]
impl Command for RecordingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
        self.log
            .lock()
            .unwrap()
            .push(format!("{}({})", self.name, rendered.join(",")));
        Ok(self.result.clone())
    }
}

/// Mock extension contributing commands under a prefix
struct MockExtension {
    name: String,
}

#[async_trait]
impl Extension for MockExtension {
    fn name(&self) -> &str {
        &self.name
    }

    async fn commands(&self) -> Result<Vec<Arc<dyn Command>>, BoxError> {
        let prefix = self.name.clone();
        Ok(vec![Arc::new(FnCommand::new(format!("{}.enabled", prefix), |_| {
            Ok(Value::Bool(true))
        }))])
    }
}

async fn base_registry() -> CommandRegistry {
    let registry = CommandRegistry::new();
    registry
        .register(Arc::new(FnCommand::constant("commandTrue", Value::Bool(true))))
        .await;
    registry
        .register(Arc::new(FnCommand::constant("commandFalse", Value::Bool(false))))
        .await;
    registry
        .register(Arc::new(FnCommand::new("getObject", |_| {
            Ok(Value::record(vec![
                ("trueProperty", Value::Bool(true)),
                (
                    "callback",
                    Value::function(|args| Ok(args.into_iter().next().unwrap_or_default())),
                ),
            ]))
        })))
        .await;
    registry
}

// ============================================================================
// Testable Properties
// ============================================================================

#[tokio::test]
async fn test_check_is_deterministic() {
    let registry = base_registry().await;
    let text = "getObject().trueProperty && (commandFalse() || 1 >= 1)";

    let first = check(&registry, text).await.unwrap();
    for _ in 0..5 {
        assert_eq!(check(&registry, text).await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_double_negation_cancels() {
    let registry = base_registry().await;
    for command in ["commandTrue()", "commandFalse()", "getObject()", "getObject().trueProperty"] {
        let plain = check(&registry, command).await.unwrap();
        let doubled = check(&registry, format!("!!{}", command)).await.unwrap();
        assert_eq!(plain, doubled, "{}", command);
    }
}

#[tokio::test]
async fn test_identical_calls_execute_once() {
    let registry = base_registry().await;
    let (count, calls) = CountingCommand::new("count");
    registry.register(Arc::new(count)).await;

    assert!(check(&registry, "[count(), count()]").await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_distinct_arguments_execute_separately() {
    let registry = base_registry().await;
    let (count, calls) = CountingCommand::new("count");
    registry.register(Arc::new(count)).await;

    assert!(check(&registry, "[count(1), count(2)]").await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_and_does_not_invoke_after_false() {
    let registry = base_registry().await;
    let (side_effect, calls) = CountingCommand::new("sideEffect");
    registry.register(Arc::new(side_effect)).await;

    assert!(!check(&registry, "commandFalse() && sideEffect()").await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chaining() {
    let registry = base_registry().await;
    assert!(check(&registry, "getObject().trueProperty").await.unwrap());
    assert!(check(&registry, "getObject().callback({KEY: true}).KEY").await.unwrap());
}

#[tokio::test]
async fn test_comparisons() {
    let registry = base_registry().await;
    assert!(check(&registry, "1 >= 1").await.unwrap());
    assert!(!check(&registry, "1 > 2").await.unwrap());
    assert!(check(&registry, "0 != 1").await.unwrap());
}

#[tokio::test]
async fn test_negation_forms() {
    let registry = base_registry().await;
    assert!(!check(&registry, "!commandTrue()").await.unwrap());
    assert!(!check(&registry, "not commandTrue()").await.unwrap());
    assert!(check(&registry, "not (commandFalse() || commandFalse())").await.unwrap());
}

#[tokio::test]
async fn test_unknown_command_fails() {
    let registry = base_registry().await;
    match check(&registry, "doesNotExist()").await {
        Err(ScopeError::UnknownCommand { name }) => assert_eq!(name, "doesNotExist"),
        other => panic!("Expected unknown command error, got {:?}", other.map_err(|e| e.to_string())),
    }
}

// ============================================================================
// Evaluation Order
// ============================================================================

#[tokio::test]
async fn test_side_effects_follow_source_order() {
    let registry = base_registry().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        registry
            .register(Arc::new(RecordingCommand {
                name: name.to_string(),
                log: log.clone(),
                result: Value::Bool(true),
            }))
            .await;
    }

    check(&registry, "[third(1), {b: first(), a: second()}, first(2)]")
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["third(1)", "first()", "second()", "first(2)"]
    );
}

#[tokio::test]
async fn test_arguments_are_evaluated_before_the_call() {
    let registry = base_registry().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    for (name, result) in [("outer", Value::Bool(true)), ("inner", Value::from("x"))] {
        registry
            .register(Arc::new(RecordingCommand {
                name: name.to_string(),
                log: log.clone(),
                result,
            }))
            .await;
    }

    check(&registry, "outer(inner(), inner())").await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["inner()", "outer(\"x\",\"x\")"]);
}

#[tokio::test]
async fn test_shared_evaluator_keeps_cache() {
    let registry = base_registry().await;
    let (count, calls) = CountingCommand::new("count");
    registry.register(Arc::new(count)).await;

    let first = parse("count() == 1").unwrap();
    let second = parse("count() == 1").unwrap();

    let mut evaluator = Evaluator::new(&registry);
    assert!(evaluator.check(&first).await.unwrap());
    assert!(evaluator.check(&second).await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_syntax_error_names_fragment() {
    let registry = base_registry().await;
    let err = check(&registry, "commandTrue() &&").await.unwrap_err();
    assert!(matches!(err, ScopeError::Syntax { .. }));
}

#[tokio::test]
async fn test_command_failure_is_not_swallowed() {
    let registry = base_registry().await;
    registry
        .register(Arc::new(FnCommand::new_async("flaky", |_| async {
            Err::<Value, BoxError>("backend unavailable".into())
        })))
        .await;

    let err = check(&registry, "commandTrue() || flaky()").await;
    assert!(err.is_ok(), "short-circuit must skip flaky()");

    let err = check(&registry, "commandFalse() || flaky()").await.unwrap_err();
    assert_eq!(err.to_string(), "backend unavailable");
}

#[tokio::test]
async fn test_unknown_property_names_key_and_target() {
    let registry = base_registry().await;
    let err = check(&registry, "getObject().nope").await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Unknown property \"nope\" on the object:"), "{}", message);
}

// ============================================================================
// Legacy Tokens and Environment
// ============================================================================

#[tokio::test]
async fn test_legacy_tokens_share_registry() {
    let registry = base_registry().await;
    let tokens = json!(["commandFalse", "or", ["commandTrue", "and", "!commandFalse"]]);
    assert!(check(&registry, Predicate::Tokens(tokens)).await.unwrap());
}

#[tokio::test]
async fn test_environment_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "debug: true\nextensions:\n  git: true\n  editor: false").unwrap();

    let config = EnvironmentLoader::new().load_config(file.path()).unwrap();
    let registry = EnvironmentBuilder::new()
        .with_command(Arc::new(FnCommand::constant("commandTrue", Value::Bool(true))))
        .with_extension(Arc::new(MockExtension {
            name: "git".to_string(),
        }))
        .with_extension(Arc::new(MockExtension {
            name: "editor".to_string(),
        }))
        .build(&config)
        .await
        .unwrap();

    assert!(registry.debug());
    assert!(check(&registry, "commandTrue() && git.enabled()").await.unwrap());
    assert!(matches!(
        check(&registry, "editor.enabled()").await,
        Err(ScopeError::UnknownCommand { .. })
    ));
}

#[tokio::test]
async fn test_evaluate_returns_structured_value() {
    let registry = base_registry().await;
    let expr = parse("{ok: getObject().trueProperty, list: [1, 'two', null]}").unwrap();
    let value = evaluate(&registry, &expr).await.unwrap();
    assert_eq!(
        value.to_json(),
        json!({"ok": true, "list": [1, "two", null]})
    );
}
