// SPDX-License-Identifier: MIT

//! Predicate DSL engine.
//!
//! A compact textual expression such as
//! `selection.precedingText().endsWith("(") && !readonly()` is parsed into an
//! AST and evaluated against a host-supplied registry of named commands.

pub mod dsl;
pub mod scope;

pub use dsl::command::{Command, FnCommand, Registry};
pub use dsl::error::ScopeError;
pub use dsl::value::Value;
pub use scope::predicate::{check, evaluate, Predicate};
pub use scope::registry::CommandRegistry;
