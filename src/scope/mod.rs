// SPDX-License-Identifier: MIT

pub mod builtins;
pub mod condition;
pub mod environment;
pub mod legacy;
pub mod predicate;
pub mod registry;
