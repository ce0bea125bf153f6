//! Host-facing query runner for Presto.
//!
//! [`PrestoRunner`] is the only type the host talks to. Each call opens its
//! own connection, so one runner can serve concurrent tasks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{self, PrestoConfig};
use crate::connection::ConnectionManager;
use crate::driver::Connector;
use crate::error::{Result, RunnerError};
use crate::query::{ExecutionOutcome, QueryExecutor};
use crate::schema::{self, SchemaEntry};

/// Statement used to probe a connection.
pub const NOOP_QUERY: &str = "SHOW TABLES";

/// Host wire shape of one execution. Exactly one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Serialized result payload.
    pub data: Option<String>,

    /// Failure or cancellation message.
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn data(payload: String) -> Self {
        Self {
            data: Some(payload),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<ExecutionOutcome> for QueryResponse {
    fn from(outcome: ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Success(result) => match result.to_payload() {
                Ok(payload) => Self::data(payload),
                Err(e) => Self::error(format!("Failed to serialize results: {e}")),
            },
            ExecutionOutcome::Failure(message) | ExecutionOutcome::Cancelled(message) => {
                Self::error(message)
            }
        }
    }
}

/// Query runner for a Presto coordinator.
#[derive(Debug, Clone)]
pub struct PrestoRunner {
    config: PrestoConfig,
    connections: ConnectionManager,
    executor: QueryExecutor,
}

impl PrestoRunner {
    /// Registry key of this runner.
    pub fn runner_type() -> &'static str {
        "presto"
    }

    /// Display name of this runner.
    pub fn name() -> &'static str {
        "Presto"
    }

    /// Declarative configuration shape rendered by the host.
    pub fn configuration_schema() -> Value {
        config::configuration_schema()
    }

    /// Reports whether this build bundles the engine client.
    pub fn enabled() -> bool {
        cfg!(feature = "http")
    }

    /// Validates `configuration` and wires the bundled HTTP client.
    #[cfg(feature = "http")]
    pub fn new(configuration: &Value) -> Result<Self> {
        Self::with_connector(configuration, Arc::new(crate::driver::PrestoConnector::new()))
    }

    /// Always fails: this build has no engine client.
    #[cfg(not(feature = "http"))]
    pub fn new(_configuration: &Value) -> Result<Self> {
        Err(RunnerError::disabled(
            "built without the `http` feature; no Presto client is available",
        ))
    }

    /// Validates `configuration` and uses `connector` for every connection.
    pub fn with_connector(configuration: &Value, connector: Arc<dyn Connector>) -> Result<Self> {
        let config = PrestoConfig::from_value(configuration)?;
        Ok(Self::from_config(config, connector))
    }

    /// Creates a runner from an already validated configuration.
    pub fn from_config(config: PrestoConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connections: ConnectionManager::new(connector),
            executor: QueryExecutor::new(),
        }
    }

    pub fn config(&self) -> &PrestoConfig {
        &self.config
    }

    /// Runs `sql` and reports the outcome as a [`QueryResponse`].
    ///
    /// Only a disabled client or a failed connection is an `Err`. Everything
    /// that goes wrong once the connection is open comes back in `error`.
    pub async fn run_query(
        &self,
        sql: &str,
        user: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        self.ensure_available()?;
        debug!(user = user.unwrap_or("<anonymous>"), "Running query");

        let connection = self.connections.open(&self.config).await?;
        let outcome = self
            .executor
            .execute(connection.as_ref(), sql, cancel)
            .await;

        Ok(outcome.into())
    }

    /// Lists tables and columns in the configured catalog.
    pub async fn get_schema(&self, cancel: &CancellationToken) -> Result<Vec<SchemaEntry>> {
        self.ensure_available()?;

        let connection = self.connections.open(&self.config).await?;
        schema::introspect(&self.executor, connection.as_ref(), &self.config, cancel).await
    }

    /// Runs [`NOOP_QUERY`] to check that the coordinator answers.
    pub async fn test_connection(&self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_available()?;

        let connection = self.connections.open(&self.config).await?;
        match self
            .executor
            .execute(connection.as_ref(), NOOP_QUERY, cancel)
            .await
        {
            ExecutionOutcome::Success(_) => Ok(()),
            outcome => {
                let message = outcome.error_message().unwrap_or_default().to_string();
                warn!(
                    "Connection test against {} failed: {}",
                    self.config.display_string(),
                    message
                );
                Err(RunnerError::query(message))
            }
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.connections.is_available() {
            Ok(())
        } else {
            Err(RunnerError::disabled("the Presto client library is not available"))
        }
    }
}
