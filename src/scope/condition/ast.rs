// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for predicate expressions

use serde::Serialize;

/// A predicate expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    /// Already resolved scalar
    Literal(Literal),
    /// `[a, b, ...]`
    Sequence(Vec<Expression>),
    /// `{key: value, ...}`; duplicate keys resolve to the last one
    Record(Vec<(String, Expression)>),
    /// Command call or built-in operator
    Invocation(Invocation),
    /// Negation of a term that cannot carry its own negation flag
    Not(Box<Expression>),
}

/// A command reference: `name(args).chain...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<Expression>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<ChainStep>,
}

/// Post-processing applied to a command result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStep {
    /// `.key`
    Property(String),
    /// `.key(args)`
    Method { name: String, args: Vec<Expression> },
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

/// Built-in operators; their names are reserved and never reach the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Operator {
    /// Resolve a reserved invocation name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::NotEq),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Lte),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Gte),
            _ => None,
        }
    }

    /// The reserved invocation name
    pub fn name(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
        }
    }

    /// `and` and `or` take any number of operands, the rest exactly two
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Invocation {
    /// Plain command call without chain or negation
    pub fn command(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
            negated: false,
            chain: Vec::new(),
        }
    }

    /// Built-in operator applied to its operands
    pub fn operator(op: Operator, args: Vec<Expression>) -> Self {
        Self::command(op.name(), args)
    }

    /// `Some` when the name is reserved for a built-in operator
    pub fn operator_kind(&self) -> Option<Operator> {
        Operator::from_name(&self.name)
    }
}

impl Expression {
    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Expression::Literal(Literal::Number(n))
    }

    pub fn boolean(b: bool) -> Self {
        Expression::Literal(Literal::Boolean(b))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    /// Command call expression
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Invocation(Invocation::command(name, args))
    }

    /// Logical negation.
    ///
    /// An invocation that is not yet negated absorbs the negation into its
    /// flag, everything else is wrapped.
    pub fn negate(self) -> Self {
        match self {
            Expression::Invocation(mut invocation) if !invocation.negated => {
                invocation.negated = true;
                Expression::Invocation(invocation)
            }
            other => Expression::Not(Box::new(other)),
        }
    }
}
