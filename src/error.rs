//! Error types for schema loading, building, and validation.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::ValueKind;

/// A single problem found while building a schema.
///
/// Every variant names the subject and variable it was found on so that a
/// whole document can be reported in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{subject}.{name}: unknown type \"{token}\": expected str, int, float, bool, or Optional[...] of those")]
    UnknownType {
        subject: String,
        name: String,
        token: String,
    },

    #[error("{subject}.{name}: default \"{default}\" is not a valid {kind}")]
    DefaultTypeMismatch {
        subject: String,
        name: String,
        default: String,
        kind: ValueKind,
    },

    #[error("{subject}.{name}: variable is declared more than once")]
    DuplicateVariable { subject: String, name: String },

    #[error("{subject}.{name}: malformed required_when \"{expression}\": expected VARIABLE=VALUE")]
    MalformedCondition {
        subject: String,
        name: String,
        expression: String,
    },

    #[error("{subject}.{name}: required_when references unknown variable {reference}")]
    UnknownReference {
        subject: String,
        name: String,
        reference: String,
    },

    #[error("{subject}.{name}: required_when cannot use {reference}: {reason}")]
    IncompatibleReference {
        subject: String,
        name: String,
        reference: String,
        reason: String,
    },

    #[error("{subject}.{name}: required_when references {reference}, which is declared in subject {other_subject}")]
    CrossSubjectCondition {
        subject: String,
        name: String,
        reference: String,
        other_subject: String,
    },

    #[error("{subject}: required_when conditions form a cycle: {}", chain.join(" -> "))]
    CircularCondition { subject: String, chain: Vec<String> },
}

/// Schema build failed. Holds every problem found.
///
/// Duplicate declarations come first, then the remaining errors subject by
/// subject in declaration order.
#[derive(Debug, Error)]
#[error("invalid schema: {} error(s)", errors.len())]
pub struct BuildError {
    pub errors: Vec<SchemaError>,
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading a schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Document errors (exit code 2)
    #[error("invalid TOML: {source}")]
    InvalidToml {
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid entry at {path}: {message}")]
    InvalidEntry { path: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors when validating an environment against a built schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("unknown application: {name}")]
    UnknownApplication { name: String },

    #[error("unknown subject: {name}")]
    UnknownSubject { name: String },

    #[error("validation failed with {} violation(s)", violations.len())]
    Invalid { violations: Vec<Violation> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Invalid { .. } => 1,
            _ => 2,
        }
    }
}

/// What went wrong with one variable during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required (unconditionally or by a true condition) but not set.
    Missing,
    /// Set, but the raw value does not parse as the declared kind.
    TypeMismatch,
}

/// A problem with one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub subject: String,
    pub variable: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.subject, self.variable, self.message)
    }
}
