//! Query execution, result normalization, and failure classification.

pub mod classify;
pub mod executor;
pub mod normalize;

pub use classify::{classify, UNSPECIFIED_ERROR};
pub use executor::{ExecutionOutcome, QueryExecutor, CANCELLED_MESSAGE};
pub use normalize::normalize;
