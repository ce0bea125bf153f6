//! Error types for the Presto runner.
//!
//! Defines the error enum surfaced to the host. Failures that happen while a
//! query is executing are not errors at this level; they are reported as data
//! through [`crate::query::ExecutionOutcome`].

use thiserror::Error;

/// Message reported when schema introspection fails for any reason.
pub const SCHEMA_ERROR_MESSAGE: &str = "Failed getting schema.";

/// Main error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Invalid or missing configuration, detected before any connection attempt.
    #[error("Configuration error: {field}: {message}")]
    Config { field: String, message: String },

    /// The engine transport could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query issued on behalf of the runner itself (e.g. the noop probe) failed.
    #[error("Query error: {0}")]
    Query(String),

    /// Schema introspection failed. The underlying message is not exposed.
    #[error("Failed getting schema.")]
    Schema,

    /// The engine client library is not available in this build.
    #[error("Runner disabled: {0}")]
    Disabled(String),
}

impl RunnerError {
    /// Creates a configuration error for the given field.
    pub fn config(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a disabled-runner error with the given message.
    pub fn disabled(msg: impl Into<String>) -> Self {
        Self::Disabled(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Schema => "Schema Error",
            Self::Disabled(_) => "Runner Disabled",
        }
    }

    /// Returns the offending configuration field, if this is a configuration error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;
