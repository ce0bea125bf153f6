//! Query result types for the Presto runner.
//!
//! Defines the canonical column types and the host-facing result structures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Engine-independent column type reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CanonicalType {
    Integer,
    Float,
    Boolean,
    String,
    Date,
    #[default]
    Unknown,
}

impl CanonicalType {
    /// Returns the wire name, or `None` for [`CanonicalType::Unknown`].
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Integer => Some("integer"),
            Self::Float => Some("float"),
            Self::Boolean => Some("boolean"),
            Self::String => Some("string"),
            Self::Date => Some("date"),
            Self::Unknown => None,
        }
    }

    /// Parses a wire name. Anything unrecognized is `Unknown`.
    pub fn from_wire(s: Option<&str>) -> Self {
        match s {
            Some("integer") => Self::Integer,
            Some("float") => Self::Float,
            Some("boolean") => Self::Boolean,
            Some("string") => Self::String,
            Some("date") => Self::Date,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("unknown"))
    }
}

// Unknown travels as null so the host falls back to inferring from the data.
impl Serialize for CanonicalType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.as_str() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CanonicalType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_wire(name.as_deref()))
    }
}

/// Maps a Presto type name to its canonical type.
///
/// Total and case-sensitive. Parameterised names such as `varchar(25)` are
/// matched on their base name.
pub fn map_presto_type(type_name: &str) -> CanonicalType {
    let base = type_name
        .split_once('(')
        .map_or(type_name, |(base, _)| base)
        .trim_end();

    match base {
        "integer" | "tinyint" | "smallint" | "long" | "bigint" => CanonicalType::Integer,
        "float" | "double" => CanonicalType::Float,
        "boolean" => CanonicalType::Boolean,
        "string" | "varchar" => CanonicalType::String,
        "date" => CanonicalType::Date,
        _ => CanonicalType::Unknown,
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within the result set.
    pub name: String,

    /// Label shown by the host; same as the name.
    pub friendly_name: String,

    /// Canonical column type.
    #[serde(rename = "type")]
    pub column_type: CanonicalType,
}

impl Column {
    /// Creates a new column with the given name and type.
    pub fn new(name: impl Into<String>, column_type: CanonicalType) -> Self {
        let name = name.into();
        Self {
            friendly_name: name.clone(),
            name,
            column_type,
        }
    }
}

/// A row keyed by column name, in column order.
pub type Row = Map<String, Value>;

/// Canonical result of a successful query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column metadata, in cursor order.
    pub columns: Vec<Column>,

    /// Rows of data.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set from columns and keyed rows.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serializes the result set into the host payload.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
