//! `required_when` conditions.
//!
//! The grammar is a single equality, `VARIABLE=LITERAL`. Conditions are
//! parsed and bound to a sibling variable while the schema is built, so a
//! broken condition never surfaces during validation.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::descriptor::VariableDescriptor;
use crate::error::SchemaError;
use crate::types::{Value, ValueKind};

/// Characters that signal a compound expression; those are not supported.
const COMPOUND_MARKERS: &[char] = &['=', '&', '|', ','];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Equals,
}

/// Right-hand side of a condition, typed after the referenced variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    String(String),
}

/// A bound `required_when` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    /// Sibling variable in the same subject.
    pub referenced_variable: String,
    pub operator: Operator,
    pub expected: Literal,
}

impl Condition {
    /// Evaluate against the referenced variable's resolved value.
    ///
    /// Null or differently-typed values never satisfy the condition.
    pub fn is_satisfied_by(&self, value: &Value) -> bool {
        match (&self.expected, value) {
            (Literal::Boolean(expected), Value::Boolean(actual)) => expected == actual,
            (Literal::String(expected), Value::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            Literal::Boolean(b) => write!(f, "{}={}", self.referenced_variable, b),
            Literal::String(s) => write!(f, "{}={}", self.referenced_variable, s),
        }
    }
}

/// A syntactically valid expression, not yet bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedCondition<'a> {
    pub variable: &'a str,
    pub literal: &'a str,
}

/// Parse `VARIABLE=LITERAL`.
pub(crate) fn parse<'a>(
    subject: &str,
    name: &str,
    expression: &'a str,
) -> Result<ParsedCondition<'a>, SchemaError> {
    let malformed = || SchemaError::MalformedCondition {
        subject: subject.to_string(),
        name: name.to_string(),
        expression: expression.to_string(),
    };

    let (variable, literal) = expression.split_once('=').ok_or_else(malformed)?;
    let variable = variable.trim();
    let literal = literal.trim();

    if !is_identifier(variable)
        || literal.is_empty()
        || literal.contains(COMPOUND_MARKERS)
        || literal.contains(char::is_whitespace)
    {
        return Err(malformed());
    }

    Ok(ParsedCondition { variable, literal })
}

/// Bind a parsed expression to the variable it references.
///
/// The referenced variable must be bool or str based, and must always have
/// a value to compare (not an optional without a default).
pub(crate) fn bind(
    subject: &str,
    name: &str,
    parsed: &ParsedCondition<'_>,
    referenced: &VariableDescriptor,
) -> Result<Condition, SchemaError> {
    let incompatible = |reason: String| SchemaError::IncompatibleReference {
        subject: subject.to_string(),
        name: name.to_string(),
        reference: parsed.variable.to_string(),
        reason,
    };

    if referenced.kind.is_nullable() && referenced.default.is_none() {
        return Err(incompatible(format!(
            "{} variable without a default may be unset",
            referenced.kind
        )));
    }

    let expected = match referenced.kind.base() {
        ValueKind::Boolean => match parsed.literal.to_ascii_lowercase().as_str() {
            "true" => Literal::Boolean(true),
            "false" => Literal::Boolean(false),
            _ => {
                return Err(incompatible(format!(
                    "expected true or false for a bool variable, got \"{}\"",
                    parsed.literal
                )))
            }
        },
        ValueKind::String => Literal::String(parsed.literal.to_string()),
        other => {
            return Err(incompatible(format!(
                "only bool and str variables can be compared, found {}",
                other
            )))
        }
    };

    Ok(Condition {
        referenced_variable: parsed.variable.to_string(),
        operator: Operator::Equals,
        expected,
    })
}

/// Find cycles among the bound conditions of one subject.
///
/// Each variable has at most one outgoing edge, so following the chain from
/// every variable is enough. A cycle is reported once, from its first
/// declared member.
pub(crate) fn find_cycles(subject: &str, variables: &[VariableDescriptor]) -> Vec<SchemaError> {
    let index: HashMap<&str, usize> = variables
        .iter()
        .enumerate()
        .map(|(i, v)| (v.name.as_str(), i))
        .collect();
    let next = |i: usize| -> Option<usize> {
        let condition = variables[i].condition.as_ref()?;
        index.get(condition.referenced_variable.as_str()).copied()
    };

    let mut errors = Vec::new();
    for start in 0..variables.len() {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(following) = next(current) {
            if following == start {
                if chain.iter().all(|&member| member >= start) {
                    let mut names: Vec<String> =
                        chain.iter().map(|&i| variables[i].name.clone()).collect();
                    names.push(variables[start].name.clone());
                    errors.push(SchemaError::CircularCondition {
                        subject: subject.to_string(),
                        chain: names,
                    });
                }
                break;
            }
            // Cycle not through `start`; it is reported from its own member.
            if chain.contains(&following) {
                break;
            }
            chain.push(following);
            current = following;
        }
    }
    errors
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
