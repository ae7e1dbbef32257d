//! Variable descriptors - the typed form of one schema entry.

use crate::condition::Condition;
use crate::error::SchemaError;
use crate::types::{RawEntry, Value, ValueKind};

/// Whether a variable must be present in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Must be set.
    Always,
    /// Must be set when its condition holds.
    Conditional,
    /// Falls back to a default or null.
    Never,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::Always => "always",
            Requirement::Conditional => "conditional",
            Requirement::Never => "never",
        }
    }
}

/// A resolved schema variable.
///
/// Built once per schema entry and owned by its [`Subject`](crate::Subject);
/// callers only ever see shared references.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub subject: String,
    /// Environment variable key.
    pub name: String,
    pub kind: ValueKind,
    /// Explicit default from the schema, already parsed as `kind`.
    pub default: Option<Value>,
    pub description: String,
    /// The `required_when` expression as written.
    pub required_when: Option<String>,
    pub condition: Option<Condition>,
    /// Applications that use this variable, deduplicated, declaration order.
    pub applications: Vec<String>,
}

impl VariableDescriptor {
    /// How this variable's absence is treated.
    ///
    /// An explicit default always wins. A condition makes the variable
    /// conditionally required even for optional kinds; otherwise optional
    /// kinds fall back to null.
    pub fn requirement(&self) -> Requirement {
        if self.default.is_some() {
            Requirement::Never
        } else if self.condition.is_some() {
            Requirement::Conditional
        } else if self.kind.is_nullable() {
            Requirement::Never
        } else {
            Requirement::Always
        }
    }

    /// Value used when the variable is absent and not required.
    pub fn fallback(&self) -> Option<Value> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if self.kind.is_nullable() => Some(Value::Null),
            None => None,
        }
    }

    /// Whether `applications` lists `application`.
    pub fn used_by(&self, application: &str) -> bool {
        self.applications.iter().any(|a| a == application)
    }
}

/// Build a descriptor from a raw entry, without its condition.
///
/// The condition is bound later by the subject graph, once every sibling is
/// known. Problems are pushed to `errors`; `None` means the entry could not
/// be typed and must not be used further.
pub(crate) fn build_descriptor(
    entry: &RawEntry,
    errors: &mut Vec<SchemaError>,
) -> Option<VariableDescriptor> {
    let Some(kind) = ValueKind::resolve(&entry.type_token) else {
        errors.push(SchemaError::UnknownType {
            subject: entry.subject.clone(),
            name: entry.name.clone(),
            token: entry.type_token.clone(),
        });
        return None;
    };

    let default = match entry.default.as_deref() {
        Some(raw) => match kind.parse_value(raw) {
            Some(value) => Some(value),
            None => {
                errors.push(SchemaError::DefaultTypeMismatch {
                    subject: entry.subject.clone(),
                    name: entry.name.clone(),
                    default: raw.to_string(),
                    kind,
                });
                return None;
            }
        },
        None => None,
    };

    Some(VariableDescriptor {
        subject: entry.subject.clone(),
        name: entry.name.clone(),
        kind,
        default,
        description: entry.description.clone(),
        required_when: entry.required_when.clone(),
        condition: None,
        applications: dedup_in_order(&entry.applications),
    })
}

fn dedup_in_order(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
