//! Application scopes - which subjects each application needs.

use serde::Serialize;

use crate::graph::Subject;

/// Subjects one application depends on, in first-encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationScope {
    pub application: String,
    pub subjects: Vec<String>,
}

/// Every application named in the schema and its scope.
///
/// Derived from the variables' `applications` lists; there is no separate
/// registry of applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApplicationScopes {
    scopes: Vec<ApplicationScope>,
}

impl ApplicationScopes {
    /// Scope for one application, if any variable names it.
    pub fn get(&self, application: &str) -> Option<&ApplicationScope> {
        self.scopes.iter().find(|s| s.application == application)
    }

    /// Application names in first-encounter order.
    pub fn applications(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.application.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ApplicationScope> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ApplicationScopes {
    type Item = &'a ApplicationScope;
    type IntoIter = std::slice::Iter<'a, ApplicationScope>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Invert variable → applications into application → subjects.
///
/// Walks subjects, then variables, then each variable's applications, all in
/// declaration order, appending a subject the first time an application
/// meets it. Output is stable for an unchanged schema.
pub fn scopes_for(subjects: &[Subject]) -> ApplicationScopes {
    let mut scopes: Vec<ApplicationScope> = Vec::new();

    for subject in subjects {
        for variable in subject.variables() {
            for application in &variable.applications {
                let position = match scopes.iter().position(|s| &s.application == application) {
                    Some(position) => position,
                    None => {
                        scopes.push(ApplicationScope {
                            application: application.clone(),
                            subjects: Vec::new(),
                        });
                        scopes.len() - 1
                    }
                };
                let scope = &mut scopes[position];
                if !scope.subjects.iter().any(|s| s == subject.name()) {
                    scope.subjects.push(subject.name().to_string());
                }
            }
        }
    }

    ApplicationScopes { scopes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_subjects;
    use crate::types::RawEntry;

    fn scopes(entries: Vec<RawEntry>) -> ApplicationScopes {
        scopes_for(&build_subjects(&entries).unwrap())
    }

    #[test]
    fn scope_follows_subject_declaration_order() {
        let scopes = scopes(vec![
            RawEntry::new("auth", "JWT_SECRET", "str").applications(["api-gateway", "user-service"]),
            RawEntry::new("database", "DATABASE_URL", "str").applications(["user-service"]),
        ]);
        let user = scopes.get("user-service").unwrap();
        assert_eq!(user.subjects, vec!["auth", "database"]);
        let gateway = scopes.get("api-gateway").unwrap();
        assert_eq!(gateway.subjects, vec!["auth"]);
    }

    #[test]
    fn applications_in_first_encounter_order() {
        let scopes = scopes(vec![
            RawEntry::new("database", "DATABASE_URL", "str")
                .applications(["order-service", "user-service"]),
            RawEntry::new("redis", "REDIS_URL", "str")
                .applications(["notification-service", "user-service"]),
        ]);
        let names: Vec<&str> = scopes.applications().collect();
        assert_eq!(names, vec!["order-service", "user-service", "notification-service"]);
    }

    #[test]
    fn subject_listed_once_per_application() {
        let scopes = scopes(vec![
            RawEntry::new("database", "DATABASE_URL", "str").applications(["user-service"]),
            RawEntry::new("database", "DATABASE_POOL_SIZE", "int")
                .default("10")
                .applications(["user-service"]),
        ]);
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes.get("user-service").unwrap().subjects, vec!["database"]);
    }

    #[test]
    fn no_applications_means_no_scopes() {
        let scopes = scopes(vec![RawEntry::new("database", "DATABASE_URL", "str")]);
        assert!(scopes.is_empty());
        assert!(scopes.get("user-service").is_none());
    }

    #[test]
    fn serializes_as_list() {
        let scopes = scopes(vec![
            RawEntry::new("auth", "JWT_SECRET", "str").applications(["api-gateway"]),
        ]);
        let json = serde_json::to_value(&scopes).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "application": "api-gateway", "subjects": ["auth"] }])
        );
    }
}
