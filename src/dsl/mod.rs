// SPDX-License-Identifier: MIT

pub mod command;
pub mod error;
pub mod members;
pub mod value;
