//! Environment Schema Resolver
//!
//! Turns one declarative schema of environment variables into per-subject
//! configuration, scoped per consuming application, with conditional
//! requirements checked when the configuration is loaded.
//!
//! Resolution is a pure two-step pipeline: [`Schema::build`] resolves a
//! document's entries into typed subjects and application scopes (failing
//! with every schema error at once), and [`Schema::evaluate`] checks an
//! environment snapshot against them (returning every violation at once).
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use env_schema::{RawEntry, Schema, ValidateError, Value};
//!
//! let schema = Schema::build(&[
//!     RawEntry::new("telemetry", "USE_OTL", "bool")
//!         .default("false")
//!         .applications(["user-service"]),
//!     RawEntry::new("telemetry", "OTL_ENDPOINT", "str")
//!         .required_when("USE_OTL=true")
//!         .applications(["user-service"]),
//! ])
//! .unwrap();
//!
//! let mut env = HashMap::new();
//! env.insert("USE_OTL".to_string(), "false".to_string());
//! let config = schema.validate_application("user-service", &env).unwrap();
//! assert_eq!(config.get("telemetry", "OTL_ENDPOINT"), Some(&Value::Null));
//!
//! env.insert("USE_OTL".to_string(), "true".to_string());
//! let err = schema.validate_application("user-service", &env).unwrap_err();
//! assert!(matches!(err, ValidateError::Invalid { violations } if violations.len() == 1));
//! ```
//!
//! # Requirement Rules
//!
//! | Declaration | Absent from environment |
//! |-------------|-------------------------|
//! | `default = ...` | default value |
//! | `required_when = "X=v"` | violation if `X == v`, else null |
//! | `Optional[...]` | null |
//! | (none) | violation |
//!
//! # Document Format
//!
//! ```toml
//! [database.DATABASE_URL]
//! type = "str"
//! description = "Main database connection URL"
//! applications = ["user-service", "order-service"]
//!
//! [database.DATABASE_POOL_SIZE]
//! type = "int"
//! default = 10
//! applications = ["user-service"]
//! ```

mod condition;
mod descriptor;
mod error;
mod evaluate;
mod graph;
mod loader;
pub mod render;
mod schema;
mod scope;
mod types;

pub use condition::{Condition, Literal, Operator};
pub use descriptor::{Requirement, VariableDescriptor};
pub use error::{BuildError, LoadError, SchemaError, ValidateError, Violation, ViolationKind};
pub use evaluate::{process_environment, Environment, ResolvedConfig, ResolvedSubject};
pub use graph::Subject;
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use schema::{Schema, Target};
pub use scope::{scopes_for, ApplicationScope, ApplicationScopes};
pub use types::{RawEntry, Value, ValueKind, TYPE_TOKENS};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
