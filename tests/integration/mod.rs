//! Integration tests for the Presto runner.

pub mod live_test;
pub mod runner_test;
pub mod schema_test;
