//! Evaluation of a built schema against an environment snapshot.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::descriptor::{Requirement, VariableDescriptor};
use crate::error::{ValidateError, Violation, ViolationKind};
use crate::graph::Subject;
use crate::types::Value;

/// Read-only view of environment variables.
pub trait Environment {
    fn get(&self, key: &str) -> Option<&str>;
}

impl<S: BuildHasher> Environment for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl Environment for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
}

/// Snapshot the current process environment.
///
/// Variables whose name or value is not valid UTF-8 are skipped.
pub fn process_environment() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Validated values for one subject, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSubject {
    pub subject: String,
    pub values: Vec<(String, Value)>,
}

impl ResolvedSubject {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Serialize for ResolvedSubject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.values.iter().map(|(n, v)| (n, v)))
    }
}

/// Validated values for every subject of a target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub subjects: Vec<ResolvedSubject>,
}

impl ResolvedConfig {
    pub fn subject(&self, name: &str) -> Option<&ResolvedSubject> {
        self.subjects.iter().find(|s| s.subject == name)
    }

    /// Shorthand for `subject(subject)?.get(name)`.
    pub fn get(&self, subject: &str, name: &str) -> Option<&Value> {
        self.subject(subject)?.get(name)
    }
}

impl Serialize for ResolvedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.subjects.iter().map(|s| (&s.subject, s)))
    }
}

/// First-pass outcome for one variable.
enum Slot<'e> {
    Resolved(Value),
    Mismatch(&'e str),
    Absent,
}

/// Evaluate subjects in the given order.
///
/// Never stops at the first problem: every violation across every subject is
/// collected, per subject in declaration order.
pub(crate) fn evaluate<'s, I, E>(subjects: I, env: &E) -> Result<ResolvedConfig, ValidateError>
where
    I: IntoIterator<Item = &'s Subject>,
    E: Environment + ?Sized,
{
    let mut resolved = ResolvedConfig::default();
    let mut violations = Vec::new();

    for subject in subjects {
        resolved
            .subjects
            .push(evaluate_subject(subject, env, &mut violations));
    }

    debug!(
        subjects = resolved.subjects.len(),
        violations = violations.len(),
        "evaluated environment"
    );

    if violations.is_empty() {
        Ok(resolved)
    } else {
        Err(ValidateError::Invalid { violations })
    }
}

fn evaluate_subject<'e, E: Environment + ?Sized>(
    subject: &Subject,
    env: &'e E,
    violations: &mut Vec<Violation>,
) -> ResolvedSubject {
    let variables = subject.variables();

    // Values do not depend on conditions, so resolve them all first; a
    // condition may then look at any sibling regardless of position.
    let slots: Vec<Slot<'e>> = variables
        .iter()
        .map(|variable| match env.get(&variable.name) {
            Some(raw) => match variable.kind.parse_value(raw) {
                Some(value) => Slot::Resolved(value),
                None => Slot::Mismatch(raw),
            },
            None => match variable.requirement() {
                Requirement::Never => Slot::Resolved(variable.fallback().unwrap_or(Value::Null)),
                Requirement::Always | Requirement::Conditional => Slot::Absent,
            },
        })
        .collect();

    let mut values = Vec::with_capacity(variables.len());
    for (variable, slot) in variables.iter().zip(&slots) {
        let value = match slot {
            Slot::Resolved(value) => value.clone(),
            Slot::Mismatch(raw) => {
                violations.push(violation(
                    variable,
                    ViolationKind::TypeMismatch,
                    format!("expected {}, got \"{}\"", variable.kind, raw),
                ));
                Value::Null
            }
            Slot::Absent => {
                if let Some(message) = missing_message(variable, variables, &slots) {
                    violations.push(violation(variable, ViolationKind::Missing, message));
                }
                Value::Null
            }
        };
        values.push((variable.name.clone(), value));
    }

    ResolvedSubject {
        subject: subject.name().to_string(),
        values,
    }
}

/// Why an absent variable is a violation, or `None` if it may stay unset.
fn missing_message(
    variable: &VariableDescriptor,
    siblings: &[VariableDescriptor],
    slots: &[Slot<'_>],
) -> Option<String> {
    let Some(condition) = &variable.condition else {
        return Some("required but not set".to_string());
    };

    let referenced = siblings
        .iter()
        .position(|v| v.name == condition.referenced_variable)
        .and_then(|i| match &slots[i] {
            Slot::Resolved(value) => Some(value),
            _ => None,
        });

    match referenced {
        Some(value) if condition.is_satisfied_by(value) => {
            Some(format!("required when {} but not set", condition))
        }
        _ => None,
    }
}

fn violation(variable: &VariableDescriptor, kind: ViolationKind, message: String) -> Violation {
    Violation {
        subject: variable.subject.clone(),
        variable: variable.name.clone(),
        kind,
        message,
    }
}
