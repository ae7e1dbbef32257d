//! Core types for schema resolution.

use std::fmt;

use serde::{Serialize, Serializer};

/// Type tokens accepted in a schema entry, in the order they are documented.
pub const TYPE_TOKENS: &[&str] = &[
    "str",
    "int",
    "float",
    "bool",
    "Optional[str]",
    "Optional[int]",
    "Optional[float]",
    "Optional[bool]",
];

/// Spellings accepted for boolean environment values (case-insensitive).
const TRUE_WORDS: &[&str] = &["true", "1", "yes", "on"];
const FALSE_WORDS: &[&str] = &["false", "0", "no", "off"];

/// Semantic kind of a configuration value.
///
/// Nullability is part of the kind: `OptionalString` is not a wrapper
/// around `String`, it is its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    OptionalString,
    OptionalInteger,
    OptionalFloat,
    OptionalBoolean,
}

impl ValueKind {
    /// Resolve a schema type token.
    ///
    /// Exact, case-sensitive match against [`TYPE_TOKENS`]. Returns `None`
    /// for anything else (caller reports `UnknownType`).
    pub fn resolve(token: &str) -> Option<Self> {
        match token {
            "str" => Some(ValueKind::String),
            "int" => Some(ValueKind::Integer),
            "float" => Some(ValueKind::Float),
            "bool" => Some(ValueKind::Boolean),
            "Optional[str]" => Some(ValueKind::OptionalString),
            "Optional[int]" => Some(ValueKind::OptionalInteger),
            "Optional[float]" => Some(ValueKind::OptionalFloat),
            "Optional[bool]" => Some(ValueKind::OptionalBoolean),
            _ => None,
        }
    }

    /// Returns the schema token for this kind.
    pub fn token(&self) -> &'static str {
        match self {
            ValueKind::String => "str",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::Boolean => "bool",
            ValueKind::OptionalString => "Optional[str]",
            ValueKind::OptionalInteger => "Optional[int]",
            ValueKind::OptionalFloat => "Optional[float]",
            ValueKind::OptionalBoolean => "Optional[bool]",
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            ValueKind::OptionalString
                | ValueKind::OptionalInteger
                | ValueKind::OptionalFloat
                | ValueKind::OptionalBoolean
        )
    }

    /// The non-null kind underlying this one.
    pub fn base(&self) -> Self {
        match self {
            ValueKind::OptionalString => ValueKind::String,
            ValueKind::OptionalInteger => ValueKind::Integer,
            ValueKind::OptionalFloat => ValueKind::Float,
            ValueKind::OptionalBoolean => ValueKind::Boolean,
            other => *other,
        }
    }

    /// Parse a raw string (environment value or schema default) as this kind.
    ///
    /// Strings are taken verbatim. Numbers are trimmed first. Booleans
    /// accept `true/false/1/0/yes/no/on/off` in any case. Returns `None`
    /// when the text does not fit the kind.
    pub fn parse_value(&self, raw: &str) -> Option<Value> {
        match self {
            ValueKind::String | ValueKind::OptionalString => Some(Value::String(raw.to_string())),
            ValueKind::Integer | ValueKind::OptionalInteger => {
                raw.trim().parse::<i64>().ok().map(Value::Integer)
            }
            ValueKind::Float | ValueKind::OptionalFloat => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            ValueKind::Boolean | ValueKind::OptionalBoolean => parse_bool(raw).map(Value::Boolean),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for ValueKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// A resolved, typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One schema entry as produced by a document parser.
///
/// This is the only input the engine accepts; it never reads files itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub subject: String,
    /// Environment variable key, unique within the subject.
    pub name: String,
    /// Type token, e.g. `int` or `Optional[str]`.
    pub type_token: String,
    pub description: String,
    pub default: Option<String>,
    pub required_when: Option<String>,
    pub applications: Vec<String>,
}

impl RawEntry {
    /// Create an entry with no default, condition, or applications.
    pub fn new(
        subject: impl Into<String>,
        name: impl Into<String>,
        type_token: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            name: name.into(),
            type_token: type_token.into(),
            description: String::new(),
            default: None,
            required_when: None,
            applications: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required_when(mut self, expression: impl Into<String>) -> Self {
        self.required_when = Some(expression.into());
        self
    }

    pub fn applications<I, S>(mut self, applications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applications = applications.into_iter().map(Into::into).collect();
        self
    }
}
