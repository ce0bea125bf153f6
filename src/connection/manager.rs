//! Connection manager: turns a validated configuration into a live connection.
//!
//! Connections are never pooled or reused. Every call to
//! [`ConnectionManager::open`] yields a fresh connection owned by the caller
//! and released when it is dropped.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{PrestoConfig, Protocol};
use crate::driver::{Connection, Connector};
use crate::error::{Result, RunnerError};

/// Identity used when the configuration names no user.
pub const DEFAULT_USERNAME: &str = "redash";

/// Schema used when the configuration names no default schema.
pub const DEFAULT_SCHEMA: &str = "default";

/// Parameters handed to a [`Connector`].
#[derive(Clone, PartialEq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub username: String,
    pub password: Option<String>,
    pub catalog: String,
    pub schema: String,
    /// Engine-specific parameters, merged in verbatim. Collisions with the
    /// fields above are resolved by the connector.
    pub extras: Map<String, Value>,
}

impl ConnectParams {
    /// Builds connection parameters from a validated configuration.
    pub fn from_config(config: &PrestoConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            protocol: config.protocol,
            username: config
                .username
                .clone()
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            password: config.password.clone().filter(|p| !p.is_empty()),
            catalog: config.catalog.clone(),
            schema: config
                .default_schema
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            extras: config.extras.clone(),
        }
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("extras", &self.extras)
            .finish()
    }
}

/// Opens connections through a connector.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
}

impl ConnectionManager {
    /// Creates a connection manager backed by the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Reports whether the backing engine client is usable.
    pub fn is_available(&self) -> bool {
        self.connector.is_available()
    }

    /// Opens a new connection for one execution.
    ///
    /// Transport failures surface as [`RunnerError::Connection`] and are not
    /// classified further.
    pub async fn open(&self, config: &PrestoConfig) -> Result<Box<dyn Connection>> {
        let params = ConnectParams::from_config(config);
        debug!(
            coordinator = %config.display_string(),
            user = %params.username,
            schema = %params.schema,
            "Opening connection"
        );

        self.connector.connect(&params).await.map_err(|e| {
            warn!("Connection to {} failed: {}", config.display_string(), e);
            RunnerError::connection(e.to_string())
        })
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("available", &self.is_available())
            .finish()
    }
}
