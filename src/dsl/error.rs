// SPDX-License-Identifier: MIT

//! Typed error handling for scope-rs
//!
//! Every failure is raised at the point of detection and propagates to the
//! caller unchanged. There is no fallback truth value.

use thiserror::Error;

/// Boxed error returned by command and method implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for scope-rs
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Malformed expression text
    #[error("Syntax error at {position}: {message} near '{fragment}'")]
    Syntax {
        message: String,
        fragment: String,
        position: usize,
    },

    /// A comparison operator received other than two operands
    #[error("Wrong number of arguments for \"{operator}\" operator: {count}")]
    Arity { operator: String, count: usize },

    /// Command name absent from the registry
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// Chain step names a member the current result does not have
    #[error("Unknown {kind} \"{key}\" on the object: {target}")]
    UnknownMember {
        kind: MemberKind,
        key: String,
        target: String,
    },

    /// Argument list could not be interpreted
    #[error("Failed to parse arguments \"{arguments}\": {message}")]
    ArgumentParse { arguments: String, message: String },

    /// Structurally invalid expression (legacy token input, hand-built AST)
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// A command or method failed while producing a value
    #[error("{source}")]
    Command {
        name: String,
        #[source]
        source: BoxError,
    },

    /// An extension failed to activate or contribute its commands
    #[error("Context extension '{name}' failed: {source}")]
    Extension {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Which kind of chain step failed a member lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberKind::Property => write!(f, "property"),
            MemberKind::Method => write!(f, "method"),
        }
    }
}

impl ScopeError {
    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, fragment: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            fragment: fragment.into(),
            position,
        }
    }

    /// Create an arity error
    pub fn arity(operator: impl Into<String>, count: usize) -> Self {
        Self::Arity {
            operator: operator.into(),
            count,
        }
    }

    /// Create an unknown command error
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Create an unknown member error
    pub fn unknown_member(kind: MemberKind, key: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnknownMember {
            kind,
            key: key.into(),
            target: target.into(),
        }
    }

    /// Create an argument parse error
    pub fn argument_parse(arguments: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArgumentParse {
            arguments: arguments.into(),
            message: message.into(),
        }
    }

    /// Wrap a failure raised by a command or method
    pub fn command(name: impl Into<String>, source: BoxError) -> Self {
        Self::Command {
            name: name.into(),
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid expression error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidExpression(message.into())
    }
}
