//! Query execution with cooperative cancellation.
//!
//! Runs a single statement on a fresh cursor and reduces whatever happens to
//! an [`ExecutionOutcome`]. Driver errors are returned as data, never as `Err`.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::classify::classify;
use super::normalize::normalize;
use crate::driver::Connection;
use crate::types::ResultSet;

/// Message reported when the caller cancels a running query.
pub const CANCELLED_MESSAGE: &str = "Query cancelled by user.";

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The statement completed; rows are normalized.
    Success(ResultSet),
    /// The statement failed with a classified message.
    Failure(String),
    /// The caller cancelled the statement.
    Cancelled(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure or cancellation message.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) | Self::Cancelled(message) => Some(message),
        }
    }
}

/// Executes statements against an open connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryExecutor;

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new() -> Self {
        Self
    }

    /// Executes `sql` on a new cursor until it completes or `cancel` fires.
    ///
    /// A token that is already cancelled wins over a result that is ready.
    pub async fn execute(
        &self,
        connection: &dyn Connection,
        sql: &str,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let cursor = connection.cursor();
        let start = Instant::now();
        debug!(sql = %sql, "Executing query");

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => None,
            result = cursor.execute(sql) => Some(result),
        };

        let elapsed = start.elapsed();
        match result {
            None => {
                cursor.cancel().await;
                info!(elapsed_ms = elapsed.as_millis() as u64, "Query cancelled");
                ExecutionOutcome::Cancelled(CANCELLED_MESSAGE.to_string())
            }
            Some(Ok(data)) => {
                let result = normalize(data);
                debug!(
                    rows = result.rows.len(),
                    columns = result.columns.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query completed"
                );
                ExecutionOutcome::Success(result)
            }
            Some(Err(e)) => {
                let message = classify(&e);
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %message,
                    "Query failed"
                );
                ExecutionOutcome::Failure(message)
            }
        }
    }
}
