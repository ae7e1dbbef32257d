//! Built schema - the immutable output of the resolution pass.

use tracing::debug;

use crate::error::{BuildError, ValidateError};
use crate::evaluate::{evaluate, Environment, ResolvedConfig};
use crate::graph::{build_subjects, Subject};
use crate::scope::{scopes_for, ApplicationScopes};
use crate::types::RawEntry;

/// What to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Subject(&'a str),
    Application(&'a str),
}

/// A fully resolved schema: subjects in declaration order plus the derived
/// application scopes.
///
/// Nothing is mutated after [`Schema::build`], so one schema can be shared
/// across threads and evaluated against any number of environments.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    subjects: Vec<Subject>,
    scopes: ApplicationScopes,
}

impl Schema {
    /// Run the full build pass over a document's entries.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` holding every schema problem found, not just
    /// the first.
    pub fn build(entries: &[RawEntry]) -> Result<Self, BuildError> {
        let subjects = build_subjects(entries).map_err(|errors| BuildError { errors })?;
        let scopes = scopes_for(&subjects);

        debug!(
            entries = entries.len(),
            subjects = subjects.len(),
            applications = scopes.len(),
            "built schema"
        );

        Ok(Self { subjects, scopes })
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name() == name)
    }

    pub fn scopes(&self) -> &ApplicationScopes {
        &self.scopes
    }

    /// Number of variables across all subjects.
    pub fn variable_count(&self) -> usize {
        self.subjects.iter().map(|s| s.variables().len()).sum()
    }

    /// Evaluate one target against an environment snapshot.
    ///
    /// Application targets are evaluated subject by subject in the
    /// application's scope order.
    ///
    /// # Errors
    ///
    /// `UnknownApplication`/`UnknownSubject` if the target is not in the
    /// schema, `Invalid` with every violation otherwise.
    pub fn evaluate<E: Environment + ?Sized>(
        &self,
        target: Target<'_>,
        env: &E,
    ) -> Result<ResolvedConfig, ValidateError> {
        match target {
            Target::Subject(name) => {
                let subject = self
                    .subject(name)
                    .ok_or_else(|| ValidateError::UnknownSubject {
                        name: name.to_string(),
                    })?;
                evaluate([subject], env)
            }
            Target::Application(name) => {
                let scope = self
                    .scopes
                    .get(name)
                    .ok_or_else(|| ValidateError::UnknownApplication {
                        name: name.to_string(),
                    })?;
                let subjects = scope.subjects.iter().filter_map(|s| self.subject(s));
                evaluate(subjects, env)
            }
        }
    }

    /// Validate everything an application needs. Used at startup.
    pub fn validate_application<E: Environment + ?Sized>(
        &self,
        name: &str,
        env: &E,
    ) -> Result<ResolvedConfig, ValidateError> {
        self.evaluate(Target::Application(name), env)
    }

    pub fn validate_subject<E: Environment + ?Sized>(
        &self,
        name: &str,
        env: &E,
    ) -> Result<ResolvedConfig, ValidateError> {
        self.evaluate(Target::Subject(name), env)
    }
}
