//! Presto query runner.
//!
//! Lets a generic data-querying host run SQL against a Presto coordinator,
//! normalize the results, introspect the catalog, and report failures as
//! plain messages.

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod logging;
pub mod query;
pub mod runner;
pub mod schema;
pub mod types;

pub use config::PrestoConfig;
pub use error::{Result, RunnerError};
pub use query::ExecutionOutcome;
pub use runner::{PrestoRunner, QueryResponse};
pub use schema::SchemaEntry;
pub use types::{CanonicalType, Column, ResultSet};
