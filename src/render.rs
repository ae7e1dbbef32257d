//! Manifest rendering - the resolved schema as JSON for code generators.
//!
//! Generators consume the manifest instead of the raw document, so every
//! decision (types, defaults, conditions, scopes) is made once, here.

use serde_json::{json, Value};

use crate::descriptor::VariableDescriptor;
use crate::graph::Subject;
use crate::schema::Schema;

/// Class-style name: `"user-service"` -> `"UserServiceConfig"`.
pub fn class_name(name: &str) -> String {
    let mut out: String = name
        .split(|c: char| c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    out.push_str("Config");
    out
}

/// Accessor name for a subject: `"DATABASE"` -> `"database_config"`.
pub fn property_name(subject: &str) -> String {
    format!("{}_config", field_name(subject))
}

/// Field name for a variable: `"DATABASE_URL"` -> `"database_url"`.
pub fn field_name(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// Render the whole schema.
pub fn manifest(schema: &Schema) -> Value {
    let subjects: Vec<Value> = schema.subjects().iter().map(render_subject).collect();
    let applications: Vec<Value> = schema
        .scopes()
        .iter()
        .map(|scope| {
            json!({
                "name": scope.application,
                "class_name": class_name(&scope.application),
                "subjects": scope.subjects,
            })
        })
        .collect();

    json!({
        "subjects": subjects,
        "applications": applications,
    })
}

fn render_subject(subject: &Subject) -> Value {
    let variables: Vec<Value> = subject.variables().iter().map(render_variable).collect();
    json!({
        "name": subject.name(),
        "class_name": class_name(subject.name()),
        "property_name": property_name(subject.name()),
        "variables": variables,
    })
}

fn render_variable(variable: &VariableDescriptor) -> Value {
    json!({
        "name": variable.name,
        "field": field_name(&variable.name),
        "type": variable.kind.base(),
        "nullable": variable.kind.is_nullable(),
        "required": variable.requirement().as_str(),
        "default": variable.default,
        "description": variable.description,
        "required_when": variable.condition,
        "applications": variable.applications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawEntry;

    #[test]
    fn naming_helpers() {
        assert_eq!(class_name("features"), "FeaturesConfig");
        assert_eq!(class_name("user-service"), "UserServiceConfig");
        assert_eq!(class_name("RATE_LIMIT"), "RateLimitConfig");
        assert_eq!(property_name("DATABASE"), "database_config");
        assert_eq!(field_name("DATABASE_URL"), "database_url");
    }

    #[test]
    fn manifest_shape() {
        let schema = Schema::build(&[
            RawEntry::new("telemetry", "USE_OTL", "bool")
                .default("false")
                .applications(["api-gateway"]),
            RawEntry::new("telemetry", "OTL_ENDPOINT", "Optional[str]")
                .required_when("USE_OTL=true")
                .applications(["api-gateway"]),
        ])
        .unwrap();

        let manifest = manifest(&schema);
        let telemetry = &manifest["subjects"][0];
        assert_eq!(telemetry["class_name"], "TelemetryConfig");
        assert_eq!(telemetry["property_name"], "telemetry_config");

        let use_otl = &telemetry["variables"][0];
        assert_eq!(use_otl["type"], "bool");
        assert_eq!(use_otl["default"], false);
        assert_eq!(use_otl["required"], "never");
        assert_eq!(use_otl["required_when"], Value::Null);

        let endpoint = &telemetry["variables"][1];
        assert_eq!(endpoint["field"], "otl_endpoint");
        assert_eq!(endpoint["type"], "str");
        assert_eq!(endpoint["nullable"], true);
        assert_eq!(endpoint["required"], "conditional");
        assert_eq!(
            endpoint["required_when"],
            json!({ "referenced_variable": "USE_OTL", "operator": "equals", "expected": true })
        );

        assert_eq!(
            manifest["applications"],
            json!([{ "name": "api-gateway", "class_name": "ApiGatewayConfig", "subjects": ["telemetry"] }])
        );
    }

    #[test]
    fn manifest_is_deterministic() {
        let entries = vec![
            RawEntry::new("redis", "REDIS_URL", "str").applications(["b", "a"]),
            RawEntry::new("auth", "JWT_SECRET", "str").applications(["a"]),
        ];
        let first = manifest(&Schema::build(&entries).unwrap()).to_string();
        let second = manifest(&Schema::build(&entries).unwrap()).to_string();
        assert_eq!(first, second);
    }
}
