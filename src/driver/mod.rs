//! Engine driver abstraction.
//!
//! Provides a trait-based interface to the engine client so that the runner
//! can work against the bundled Presto REST client or any substitute (such as
//! [`MockConnector`] in tests).

mod mock;
#[cfg(feature = "http")]
mod presto;

pub use mock::{MockConnector, MockResponse, MockStats};
#[cfg(feature = "http")]
pub use presto::{PrestoConnector, SessionSettings};

use crate::connection::ConnectParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Column descriptor as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Engine-native type name (e.g. "bigint", "varchar(25)").
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ColumnDescriptor {
    /// Creates a descriptor with the given name and engine type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Raw output of a completed query: descriptors plus positional rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryData {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

/// Failure reported by the engine itself for a query it accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// The engine's structured error object (`message`, `errorName`, `failureInfo`, ...).
    Structured(Value),

    /// A bare message with no structured detail.
    Message(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(payload) => write!(f, "{payload}"),
            Self::Message(message) => f.write_str(message),
        }
    }
}

/// Every failure a driver can report. Closed so classification stays exhaustive.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Query-level failure reported by the engine.
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// The coordinator could not be reached or answered with a non-success status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A connection parameter had an unusable value.
    #[error("Invalid connection parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DriverError {
    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates an invalid-parameter error.
    pub fn invalid_parameter(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: msg.into(),
        }
    }
}

/// Factory for engine connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Reports whether the underlying client can be used at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Establishes a connection with the given parameters.
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> std::result::Result<Box<dyn Connection>, DriverError>;
}

/// An open connection. Released when dropped.
pub trait Connection: Send + Sync {
    /// Creates a fresh cursor for one query.
    fn cursor(&self) -> Box<dyn Cursor>;
}

/// Per-query handle. Released when dropped.
#[async_trait]
pub trait Cursor: Send + Sync {
    /// Runs `sql` and fetches every result row.
    async fn execute(&self, sql: &str) -> std::result::Result<QueryData, DriverError>;

    /// Best-effort cancel of the query last issued on this cursor.
    async fn cancel(&self);
}
