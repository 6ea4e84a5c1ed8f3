// SPDX-License-Identifier: MIT

//! Predicate parsing and evaluation
//!
//! Predicates are compact expressions over host commands, for example:
//! - `editor.hasSelection() && !readonly()`
//! - `selection.precedingText().endsWith("(")`
//! - `os() == 'linux' or not env(CI)`

pub mod ast;
pub mod cache;
pub mod evaluator;
mod lexer;
pub mod parser;

pub use ast::{ChainStep, Expression, Invocation, Literal, Operator};
pub use cache::{CacheKey, InvocationCache};
pub use evaluator::Evaluator;
pub use parser::parse;
