//! Schema document loading from files, strings, and HTTP URLs.
//!
//! A document is TOML: each top-level table is a subject and each of its
//! sub-tables declares one variable.
//!
//! ```toml
//! [telemetry.USE_OTL]
//! type = "bool"
//! default = false
//! applications = ["user-service"]
//! ```

use std::path::Path;

use toml::{Table, Value};

use crate::error::LoadError;
use crate::types::RawEntry;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Keys allowed in a variable table.
const ENTRY_KEYS: &[&str] = &[
    "type",
    "description",
    "default",
    "required_when",
    "applications",
];

/// Load a schema document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidToml` if it isn't valid TOML, or
/// `LoadError::InvalidEntry` if an entry has the wrong shape.
pub fn load_document(path: &Path) -> Result<Vec<RawEntry>, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content)
}

/// Load a schema document from a TOML string.
///
/// Entries come back in document order.
pub fn load_document_str(content: &str) -> Result<Vec<RawEntry>, LoadError> {
    let table: Table =
        toml::from_str(content).map_err(|source| LoadError::InvalidToml { source })?;

    let mut entries = Vec::new();
    for (subject, variables) in &table {
        let Value::Table(variables) = variables else {
            return Err(invalid(
                subject,
                format!(
                    "expected a table of variables, got {}",
                    variables.type_str()
                ),
            ));
        };

        for (name, fields) in variables {
            let path = format!("{}.{}", subject, name);
            let Value::Table(fields) = fields else {
                return Err(invalid(
                    &path,
                    format!("expected a variable table, got {}", fields.type_str()),
                ));
            };
            entries.push(entry_from_table(subject, name, fields, &path)?);
        }
    }

    Ok(entries)
}

/// Load a schema document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or any parse
/// error from [`load_document_str`].
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Vec<RawEntry>, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load from a file path or, with the `remote` feature, a URL.
pub fn load_document_auto(source: &str) -> Result<Vec<RawEntry>, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

fn entry_from_table(
    subject: &str,
    name: &str,
    fields: &Table,
    path: &str,
) -> Result<RawEntry, LoadError> {
    if let Some(key) = fields.keys().find(|k| !ENTRY_KEYS.contains(&k.as_str())) {
        return Err(invalid(path, format!("unknown key \"{}\"", key)));
    }

    let type_token = match fields.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(invalid(
                path,
                format!("type must be a string, got {}", other.type_str()),
            ))
        }
        None => return Err(invalid(path, "missing type".to_string())),
    };

    let default = match fields.get("default") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Integer(i)) => Some(i.to_string()),
        // Debug keeps the fraction, so `8000.0` stays a float literal.
        Some(Value::Float(f)) => Some(format!("{:?}", f)),
        Some(Value::Boolean(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(invalid(
                path,
                format!("default must be a scalar, got {}", other.type_str()),
            ))
        }
    };

    let applications = match fields.get("applications") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(
                    path,
                    format!(
                        "applications must contain strings, got {}",
                        other.type_str()
                    ),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(invalid(
                path,
                format!("applications must be an array, got {}", other.type_str()),
            ))
        }
    };

    Ok(RawEntry {
        subject: subject.to_string(),
        name: name.to_string(),
        type_token,
        description: optional_string(fields, "description", path)?.unwrap_or_default(),
        default,
        required_when: optional_string(fields, "required_when", path)?,
        applications,
    })
}

fn optional_string(fields: &Table, key: &str, path: &str) -> Result<Option<String>, LoadError> {
    match fields.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(
            path,
            format!("{} must be a string, got {}", key, other.type_str()),
        )),
    }
}

fn invalid(path: &str, message: String) -> LoadError {
    LoadError::InvalidEntry {
        path: path.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TELEMETRY: &str = r#"
[telemetry.USE_OTL]
type = "bool"
default = false
description = "Enable OpenTelemetry tracing"
applications = ["user-service", "api-gateway"]

[telemetry.OTL_ENDPOINT]
type = "str"
required_when = "USE_OTL=true"
applications = ["user-service"]

[database.DATABASE_POOL_SIZE]
type = "int"
default = 10
"#;

    #[test]
    fn float_default_keeps_fraction() {
        let entries = load_document_str(
            "[http.API_PORT]\ntype = \"int\"\ndefault = 8000.0\n\n[http.API_VERSION]\ntype = \"str\"\ndefault = 1.0\n",
        )
        .unwrap();
        assert_eq!(entries[0].default.as_deref(), Some("8000.0"));
        assert_eq!(entries[1].default.as_deref(), Some("1.0"));

        let err = crate::Schema::build(&entries[..1]).unwrap_err();
        assert!(matches!(
            &err.errors[..],
            [crate::SchemaError::DefaultTypeMismatch { name, default, .. }]
                if name == "API_PORT" && default == "8000.0"
        ));

        let schema = crate::Schema::build(&entries[1..]).unwrap();
        let version = schema.subject("http").unwrap().variable("API_VERSION").unwrap();
        assert_eq!(
            version.default,
            Some(crate::Value::String("1.0".to_string()))
        );
    }

    #[test]
    fn load_document_str_preserves_order() {
        let entries = load_document_str(TELEMETRY).unwrap();
        let keys: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.subject.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("telemetry", "USE_OTL"),
                ("telemetry", "OTL_ENDPOINT"),
                ("database", "DATABASE_POOL_SIZE"),
            ]
        );
    }

    #[test]
    fn scalar_defaults_are_stringified() {
        let entries = load_document_str(TELEMETRY).unwrap();
        assert_eq!(entries[0].default.as_deref(), Some("false"));
        assert_eq!(entries[2].default.as_deref(), Some("10"));
        assert_eq!(entries[1].default, None);
    }

    #[test]
    fn fields_are_carried_over() {
        let entries = load_document_str(TELEMETRY).unwrap();
        assert_eq!(entries[0].description, "Enable OpenTelemetry tracing");
        assert_eq!(entries[0].applications, vec!["user-service", "api-gateway"]);
        assert_eq!(entries[1].required_when.as_deref(), Some("USE_OTL=true"));
        assert_eq!(entries[2].description, "");
        assert!(entries[2].applications.is_empty());
    }

    #[test]
    fn missing_type_is_invalid() {
        let result = load_document_str("[auth.JWT_SECRET]\ndescription = \"secret\"\n");
        assert!(matches!(
            result,
            Err(LoadError::InvalidEntry { path, message }) if path == "auth.JWT_SECRET" && message == "missing type"
        ));
    }

    #[test]
    fn unknown_key_is_invalid() {
        let result = load_document_str("[auth.JWT_SECRET]\ntype = \"str\"\nrequire_when = \"X=1\"\n");
        assert!(matches!(result, Err(LoadError::InvalidEntry { .. })));
    }

    #[test]
    fn non_table_subject_is_invalid() {
        let result = load_document_str("auth = 1\n");
        assert!(matches!(
            result,
            Err(LoadError::InvalidEntry { path, .. }) if path == "auth"
        ));
    }

    #[test]
    fn array_default_is_invalid() {
        let result = load_document_str("[auth.HOSTS]\ntype = \"str\"\ndefault = [\"a\"]\n");
        assert!(matches!(result, Err(LoadError::InvalidEntry { .. })));
    }

    #[test]
    fn non_string_application_is_invalid() {
        let result = load_document_str("[auth.JWT_SECRET]\ntype = \"str\"\napplications = [1]\n");
        assert!(matches!(result, Err(LoadError::InvalidEntry { .. })));
    }

    #[test]
    fn invalid_toml() {
        let result = load_document_str("[auth.JWT_SECRET\ntype = ");
        assert!(matches!(result, Err(LoadError::InvalidToml { .. })));
    }

    #[test]
    fn load_document_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", TELEMETRY).unwrap();

        let entries = load_document(file.path()).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", TELEMETRY).unwrap();

        let entries = load_document_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(entries[0].name, "USE_OTL");
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/config.toml"));
        assert!(is_url("http://example.com/config.toml"));
        assert!(!is_url("/path/to/config.toml"));
        assert!(!is_url("config.toml"));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/config.toml")
                .with_status(200)
                .with_body(TELEMETRY)
                .create();

            let entries = load_document_url(&format!("{}/config.toml", server.url())).unwrap();
            assert_eq!(entries.len(), 3);
            mock.assert();
        }

        #[test]
        fn load_document_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.toml").with_status(404).create();

            let result = load_document_url(&format!("{}/missing.toml", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
            assert_eq!(result.unwrap_err().exit_code(), 3);
        }

        #[test]
        fn load_document_auto_url() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/config.toml")
                .with_status(200)
                .with_body(TELEMETRY)
                .create();

            let result = load_document_auto(&format!("{}/config.toml", server.url()));
            assert!(result.is_ok());
        }
    }
}
