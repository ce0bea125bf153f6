//! Connection management for the Presto runner.
//!
//! Centralizes connection parameters and connection lifecycle.

pub mod manager;

pub use manager::{ConnectParams, ConnectionManager, DEFAULT_SCHEMA, DEFAULT_USERNAME};
