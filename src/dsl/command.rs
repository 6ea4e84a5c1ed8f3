use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use super::error::{BoxError, ScopeError};
use super::value::{async_callable, sync_callable, Callable, Value};

/// A named operation the host exposes to predicates.
///
/// # Notes
/// - `name()` and `description()` return `&str` to avoid allocation on every call
/// - `execute` may suspend; the evaluator awaits it without blocking other work
#[async_trait]
pub trait Command: Send + Sync {
    /// Returns the command name (unique within a registry)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the command produces
    fn description(&self) -> &str {
        ""
    }

    /// Execute the command with already evaluated positional arguments
    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError>;
}

/// The only interface the evaluator depends on: one flattened
/// name→operation mapping plus a debug flag.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Invoke `name` with positional arguments.
    ///
    /// Fails with [`ScopeError::UnknownCommand`] when the name is not registered.
    async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, ScopeError>;

    /// Whether each real command invocation should be logged
    fn debug(&self) -> bool {
        false
    }
}

/// Command backed by a closure
pub struct FnCommand {
    name: String,
    description: String,
    func: Arc<dyn Callable>,
}

impl FnCommand {
    /// Create a command from a synchronous closure
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::from_callable(name.into(), sync_callable(f))
    }

    /// Create a command from an async closure
    pub fn new_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self::from_callable(name.into(), async_callable(f))
    }

    /// Command that always returns a clone of `value`
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, move |_| Ok(value.clone()))
    }

    fn from_callable(name: String, func: Arc<dyn Callable>) -> Self {
        Self {
            description: format!("Closure command: {}", name),
            name,
            func,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Command for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value, BoxError> {
        self.func.call(args).await
    }
}
