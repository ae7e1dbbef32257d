//! Subject graph - groups descriptors by subject and binds their conditions.

use std::collections::HashMap;

use tracing::debug;

use crate::condition;
use crate::descriptor::{build_descriptor, VariableDescriptor};
use crate::error::SchemaError;
use crate::types::RawEntry;

/// An ordered group of variables sharing one subject name.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    name: String,
    variables: Vec<VariableDescriptor>,
}

impl Subject {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Build every subject from the raw entries.
///
/// Runs descriptor building, duplicate detection, and condition binding over
/// the whole document, collecting every error before returning.
pub(crate) fn build_subjects(entries: &[RawEntry]) -> Result<Vec<Subject>, Vec<SchemaError>> {
    let mut errors = Vec::new();
    let groups = group_entries(entries, &mut errors);

    // Subjects declaring each variable name, for cross-subject diagnostics.
    let mut homes: HashMap<&str, Vec<&str>> = HashMap::new();
    for (subject, group) in &groups {
        for entry in group {
            homes.entry(entry.name.as_str()).or_default().push(*subject);
        }
    }

    let mut subjects = Vec::with_capacity(groups.len());
    for (subject, group) in &groups {
        let slots: Vec<Option<VariableDescriptor>> = group
            .iter()
            .map(|entry| build_descriptor(entry, &mut errors))
            .collect();
        let index: HashMap<&str, usize> = group
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name.as_str(), i))
            .collect();

        let mut conditions = Vec::with_capacity(group.len());
        for entry in group {
            let condition = match entry.required_when.as_deref() {
                Some(expression) => {
                    bind_condition(entry, expression, &slots, &index, &homes, &mut errors)
                }
                None => None,
            };
            conditions.push(condition);
        }

        let variables: Vec<VariableDescriptor> = slots
            .into_iter()
            .zip(conditions)
            .filter_map(|(slot, condition)| {
                slot.map(|mut descriptor| {
                    descriptor.condition = condition;
                    descriptor
                })
            })
            .collect();

        errors.extend(condition::find_cycles(subject, &variables));
        debug!(subject = *subject, variables = variables.len(), "built subject");

        subjects.push(Subject {
            name: subject.to_string(),
            variables,
        });
    }

    if errors.is_empty() {
        Ok(subjects)
    } else {
        Err(errors)
    }
}

/// Group entries by subject, first-seen order for subjects and variables.
///
/// A repeated `(subject, name)` is reported and dropped; the first
/// declaration is kept.
fn group_entries<'a>(
    entries: &'a [RawEntry],
    errors: &mut Vec<SchemaError>,
) -> Vec<(&'a str, Vec<&'a RawEntry>)> {
    let mut groups: Vec<(&str, Vec<&RawEntry>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let position = *positions.entry(entry.subject.as_str()).or_insert_with(|| {
            groups.push((entry.subject.as_str(), Vec::new()));
            groups.len() - 1
        });
        let group = &mut groups[position].1;
        if group.iter().any(|existing| existing.name == entry.name) {
            errors.push(SchemaError::DuplicateVariable {
                subject: entry.subject.clone(),
                name: entry.name.clone(),
            });
            continue;
        }
        group.push(entry);
    }
    groups
}

fn bind_condition(
    entry: &RawEntry,
    expression: &str,
    slots: &[Option<VariableDescriptor>],
    index: &HashMap<&str, usize>,
    homes: &HashMap<&str, Vec<&str>>,
    errors: &mut Vec<SchemaError>,
) -> Option<condition::Condition> {
    let parsed = match condition::parse(&entry.subject, &entry.name, expression) {
        Ok(parsed) => parsed,
        Err(e) => {
            errors.push(e);
            return None;
        }
    };

    let Some(&position) = index.get(parsed.variable) else {
        let other_subject = homes
            .get(parsed.variable)
            .and_then(|subjects| subjects.iter().find(|s| **s != entry.subject))
            .map(|s| s.to_string());
        errors.push(match other_subject {
            Some(other_subject) => SchemaError::CrossSubjectCondition {
                subject: entry.subject.clone(),
                name: entry.name.clone(),
                reference: parsed.variable.to_string(),
                other_subject,
            },
            None => SchemaError::UnknownReference {
                subject: entry.subject.clone(),
                name: entry.name.clone(),
                reference: parsed.variable.to_string(),
            },
        });
        return None;
    };

    // Referenced variable failed to build; its own error is already recorded.
    let referenced = slots[position].as_ref()?;

    match condition::bind(&entry.subject, &entry.name, &parsed, referenced) {
        Ok(condition) => Some(condition),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(subject: &Subject) -> Vec<&str> {
        subject.variables().iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let entries = vec![
            RawEntry::new("redis", "REDIS_URL", "str"),
            RawEntry::new("database", "DATABASE_URL", "str"),
            RawEntry::new("redis", "REDIS_TTL", "int").default("3600"),
            RawEntry::new("database", "DATABASE_TIMEOUT", "int").default("30"),
        ];
        let subjects = build_subjects(&entries).unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name(), "redis");
        assert_eq!(names(&subjects[0]), vec!["REDIS_URL", "REDIS_TTL"]);
        assert_eq!(subjects[1].name(), "database");
        assert_eq!(names(&subjects[1]), vec!["DATABASE_URL", "DATABASE_TIMEOUT"]);
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let entries = vec![
            RawEntry::new("database", "DATABASE_URL", "str"),
            RawEntry::new("database", "DATABASE_URL", "str").default("sqlite://"),
        ];
        let errors = build_subjects(&entries).unwrap_err();
        assert!(matches!(
            &errors[..],
            [SchemaError::DuplicateVariable { subject, name }]
                if subject == "database" && name == "DATABASE_URL"
        ));
    }

    #[test]
    fn same_name_in_two_subjects_is_allowed() {
        let entries = vec![
            RawEntry::new("redis", "URL", "str"),
            RawEntry::new("database", "URL", "str"),
        ];
        assert!(build_subjects(&entries).is_ok());
    }

    #[test]
    fn condition_binds_to_later_sibling() {
        let entries = vec![
            RawEntry::new("telemetry", "OTL_ENDPOINT", "str").required_when("USE_OTL=true"),
            RawEntry::new("telemetry", "USE_OTL", "bool").default("false"),
        ];
        let subjects = build_subjects(&entries).unwrap();
        let endpoint = subjects[0].variable("OTL_ENDPOINT").unwrap();
        assert_eq!(
            endpoint.condition.as_ref().unwrap().referenced_variable,
            "USE_OTL"
        );
    }

    #[test]
    fn cross_subject_condition_is_rejected() {
        let entries = vec![
            RawEntry::new("telemetry", "USE_OTL", "bool").default("false"),
            RawEntry::new("http", "OTL_ENDPOINT", "str").required_when("USE_OTL=true"),
        ];
        let errors = build_subjects(&entries).unwrap_err();
        assert!(matches!(
            &errors[..],
            [SchemaError::CrossSubjectCondition { other_subject, .. }] if other_subject == "telemetry"
        ));
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let entries =
            vec![RawEntry::new("telemetry", "OTL_ENDPOINT", "str").required_when("USE_OTEL=true")];
        let errors = build_subjects(&entries).unwrap_err();
        assert!(matches!(
            &errors[..],
            [SchemaError::UnknownReference { reference, .. }] if reference == "USE_OTEL"
        ));
    }

    #[test]
    fn reference_to_untyped_variable_reports_type_only() {
        let entries = vec![
            RawEntry::new("telemetry", "USE_OTL", "boolean"),
            RawEntry::new("telemetry", "OTL_ENDPOINT", "str").required_when("USE_OTL=true"),
        ];
        let errors = build_subjects(&entries).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SchemaError::UnknownType { .. }));
    }

    #[test]
    fn all_errors_are_collected() {
        let entries = vec![
            RawEntry::new("database", "DATABASE_URL", "url"),
            RawEntry::new("database", "DATABASE_URL", "str"),
            RawEntry::new("http", "API_PORT", "int").default("port"),
            RawEntry::new("features", "A", "bool").required_when("B=true"),
            RawEntry::new("features", "B", "bool").required_when("A=true"),
            RawEntry::new("features", "C", "str").required_when("nope"),
        ];
        let errors = build_subjects(&entries).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], SchemaError::DuplicateVariable { .. }));
        assert!(matches!(errors[1], SchemaError::UnknownType { .. }));
        assert!(matches!(errors[2], SchemaError::DefaultTypeMismatch { .. }));
        assert!(matches!(errors[3], SchemaError::MalformedCondition { .. }));
        assert!(matches!(errors[4], SchemaError::CircularCondition { .. }));
    }
}
