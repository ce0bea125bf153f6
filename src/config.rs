//! Configuration management for the Presto runner.
//!
//! The host hands the runner a loosely-typed JSON object. [`PrestoConfig::from_value`]
//! validates it once and applies every default, so nothing downstream ever
//! consults an absent field.

use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;

/// Fields recognized in the raw configuration object, in form order.
pub const CONFIG_FIELDS: &[&str] = &[
    "host",
    "protocol",
    "port",
    "username",
    "password",
    "default_schema",
    "table_filter",
    "catalog",
    "extras",
];

fn default_port() -> u16 {
    8080
}

fn default_catalog() -> String {
    "hive".to_string()
}

/// Transport scheme used to reach the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// Returns the protocol as a URL scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Parses a protocol from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, fully-defaulted runner configuration.
#[derive(Clone, PartialEq, Serialize)]
pub struct PrestoConfig {
    /// Coordinator host name.
    pub host: String,

    /// Transport scheme.
    pub protocol: Protocol,

    /// Coordinator port.
    pub port: u16,

    /// Identity the queries run as.
    pub username: Option<String>,

    /// Password; an empty string in the raw config means no credential.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Schema used for unqualified table names.
    pub default_schema: Option<String>,

    /// Catalog queried for data and metadata.
    pub catalog: String,

    /// Regular expression over `schema.table`; empty matches everything.
    pub table_filter: String,

    /// Engine-specific connection parameters, passed through untouched.
    pub extras: Map<String, Value>,
}

impl PrestoConfig {
    /// Creates a config for the given host with every other field defaulted.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            protocol: Protocol::default(),
            port: default_port(),
            username: None,
            password: None,
            default_schema: None,
            catalog: default_catalog(),
            table_filter: String::new(),
            extras: Map::new(),
        }
    }

    /// Validates a raw configuration object and applies defaults.
    ///
    /// Fails with [`RunnerError::Config`] naming the first offending field.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| RunnerError::config("configuration", "expected a JSON object"))?;

        for key in obj.keys() {
            if !CONFIG_FIELDS.contains(&key.as_str()) {
                debug!(field = %key, "Ignoring unrecognized configuration field");
            }
        }

        let host = optional_string(obj, "host")?
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| RunnerError::config("host", "is required"))?;

        let protocol = match optional_string(obj, "protocol")? {
            Some(value) => Protocol::parse(&value).ok_or_else(|| {
                RunnerError::config(
                    "protocol",
                    format!("unsupported protocol '{value}', expected 'http' or 'https'"),
                )
            })?,
            None => Protocol::default(),
        };

        Ok(Self {
            host,
            protocol,
            port: parse_port(obj.get("port"))?,
            username: optional_string(obj, "username")?,
            password: optional_string(obj, "password")?,
            default_schema: optional_string(obj, "default_schema")?,
            catalog: optional_string(obj, "catalog")?.unwrap_or_else(default_catalog),
            table_filter: optional_string(obj, "table_filter")?.unwrap_or_default(),
            extras: parse_extras(obj.get("extras"))?,
        })
    }

    /// Returns a display-safe string (no credentials) for logs.
    pub fn display_string(&self) -> String {
        format!(
            "{} @ {}://{}:{}",
            self.catalog, self.protocol, self.host, self.port
        )
    }
}

impl fmt::Debug for PrestoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrestoConfig")
            .field("host", &self.host)
            .field("protocol", &self.protocol)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("default_schema", &self.default_schema)
            .field("catalog", &self.catalog)
            .field("table_filter", &self.table_filter)
            .field("extras", &self.extras)
            .finish()
    }
}

/// Reads an optional string field. Null and empty strings count as absent.
fn optional_string(obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(RunnerError::config(
            field,
            format!("expected a string, got {}", json_kind(other)),
        )),
    }
}

fn parse_port(value: Option<&Value>) -> Result<u16> {
    let number = match value {
        None | Some(Value::Null) => return Ok(default_port()),
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(RunnerError::config(
                "port",
                format!("expected a number, got {}", json_kind(other)),
            ))
        }
    };

    // Form inputs of type "number" may arrive as 8080.0.
    let port = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64)
    });

    match port {
        Some(p) if (1..=u64::from(u16::MAX)).contains(&p) => Ok(p as u16),
        _ => Err(RunnerError::config(
            "port",
            format!("{number} is not a valid port"),
        )),
    }
}

/// Extras may be an object, null, or a string holding a JSON object.
fn parse_extras(value: Option<&Value>) -> Result<Map<String, Value>> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(Map::new()),
            Ok(other) => Err(RunnerError::config(
                "extras",
                format!("expected a JSON object, got {}", json_kind(&other)),
            )),
            Err(e) => Err(RunnerError::config(
                "extras",
                format!("invalid JSON: {e}"),
            )),
        },
        Some(other) => Err(RunnerError::config(
            "extras",
            format!("expected an object, got {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns the declarative configuration descriptor the host renders as a form.
pub fn configuration_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "host": { "type": "string" },
            "protocol": { "type": "string", "default": "http" },
            "port": { "type": "number", "default": default_port() },
            "username": { "type": "string" },
            "password": { "type": "string" },
            "default_schema": { "type": "string", "default": "default" },
            "table_filter": {
                "type": "string",
                "default": "",
                "title": "RegExp to filter schema.tables"
            },
            "catalog": { "type": "string", "default": default_catalog() },
            "extras": {
                "type": "object",
                "default": "{ \"requests_kwargs\": null }",
                "props": {
                    "rows": 2,
                    "extra": "Extra connection parameters passed to the Presto client"
                }
            }
        },
        "order": CONFIG_FIELDS,
        "required": ["host"],
        "secret": ["password"],
        "extra_options": ["extras"]
    })
}
