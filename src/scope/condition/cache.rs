// SPDX-License-Identifier: MIT

//! Per-evaluation invocation cache
//!
//! Keys are the command name plus a canonical rendering of the evaluated
//! arguments, so structurally equal arguments hit the same entry while `1`
//! and `"1"` stay distinct.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::dsl::value::Value;

/// Identifies one command call within an evaluation.
///
/// Functions and handles render as their address, so the key holds on to
/// the argument values; an address cannot be reused while the key is alive.
#[derive(Debug, Clone)]
pub struct CacheKey {
    name: String,
    rendered: String,
    args: Vec<Value>,
}

impl CacheKey {
    pub fn new(name: &str, args: &[Value]) -> Self {
        let mut rendered = String::from("[");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                rendered.push(',');
            }
            arg.write_canonical(&mut rendered);
        }
        rendered.push(']');

        Self {
            name: name.to_string(),
            rendered,
            args: args.to_vec(),
        }
    }

    /// The arguments this key was built from
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rendered == other.rendered
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.rendered.hash(state);
    }
}

/// Memo table owned by exactly one evaluation
#[derive(Default)]
pub struct InvocationCache {
    entries: HashMap<CacheKey, Value>,
}

impl InvocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
