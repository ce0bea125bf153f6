//! Presto REST client implementation.
//!
//! Implements the driver traits over the coordinator's statement protocol:
//! the query is POSTed to `/v1/statement`, result pages are followed through
//! `nextUri` until the query finishes, and a DELETE on the current `nextUri`
//! cancels it.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

use super::{
    ColumnDescriptor, Connection, Connector, Cursor, DatabaseError, DriverError, QueryData,
};
use crate::connection::ConnectParams;

/// Statement endpoint path on the coordinator.
const STATEMENT_PATH: &str = "/v1/statement";

/// Source reported to the coordinator unless overridden by `extras.source`.
const DEFAULT_SOURCE: &str = "presto-runner";

const HEADER_USER: &str = "X-Presto-User";
const HEADER_SOURCE: &str = "X-Presto-Source";
const HEADER_CATALOG: &str = "X-Presto-Catalog";
const HEADER_SCHEMA: &str = "X-Presto-Schema";
const HEADER_SESSION: &str = "X-Presto-Session";
const HEADER_CLIENT_TAGS: &str = "X-Presto-Client-Tags";

/// Per-connection request settings derived from [`ConnectParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub statement_url: Url,
    pub user: String,
    pub password: Option<String>,
    pub catalog: String,
    pub schema: String,
    pub source: String,
    pub session_properties: Vec<(String, String)>,
    pub client_tags: Vec<String>,
    pub poll_interval: Duration,
}

impl SessionSettings {
    /// Resolves settings from connection parameters. Extras are applied last,
    /// so `username`, `catalog` and `schema` given there win.
    pub fn from_params(params: &ConnectParams) -> Result<Self, DriverError> {
        let base = format!("{}://{}:{}", params.protocol, params.host, params.port);
        let statement_url = Url::parse(&base)
            .and_then(|url| url.join(STATEMENT_PATH))
            .map_err(|e| {
                DriverError::transport(format!("Invalid coordinator address '{base}': {e}"))
            })?;

        let mut settings = Self {
            statement_url,
            user: params.username.clone(),
            password: params.password.clone(),
            catalog: params.catalog.clone(),
            schema: params.schema.clone(),
            source: DEFAULT_SOURCE.to_string(),
            session_properties: Vec::new(),
            client_tags: Vec::new(),
            poll_interval: Duration::ZERO,
        };

        for (key, value) in &params.extras {
            settings.apply_extra(key, value)?;
        }

        Ok(settings)
    }

    fn apply_extra(&mut self, key: &str, value: &Value) -> Result<(), DriverError> {
        match key {
            "source" => self.source = string_extra(key, value)?,
            "username" => self.user = string_extra(key, value)?,
            "catalog" => self.catalog = string_extra(key, value)?,
            "schema" => self.schema = string_extra(key, value)?,
            "session_props" => self.session_properties = session_props_extra(value)?,
            "client_tags" => self.client_tags = client_tags_extra(value)?,
            "poll_interval" => {
                let seconds = value
                    .as_f64()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| {
                        DriverError::invalid_parameter(key, "expected a non-negative number")
                    })?;
                self.poll_interval = Duration::try_from_secs_f64(seconds)
                    .map_err(|_| DriverError::invalid_parameter(key, "out of range"))?;
            }
            "requests_kwargs" => {
                if !value.is_null() {
                    warn!("Ignoring unsupported connection parameter 'requests_kwargs'");
                }
            }
            other => warn!(parameter = %other, "Ignoring unrecognized connection parameter"),
        }
        Ok(())
    }
}

fn string_extra(key: &str, value: &Value) -> Result<String, DriverError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DriverError::invalid_parameter(key, "expected a string"))
}

fn session_props_extra(value: &Value) -> Result<Vec<(String, String)>, DriverError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(props) => Ok(props
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()),
        _ => Err(DriverError::invalid_parameter(
            "session_props",
            "expected an object",
        )),
    }
}

fn client_tags_extra(value: &Value) -> Result<Vec<String>, DriverError> {
    let invalid = || DriverError::invalid_parameter("client_tags", "expected an array of strings");
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(tags) => tags
            .iter()
            .map(|tag| tag.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

/// Connector for the bundled Presto REST client.
#[derive(Debug, Clone, Default)]
pub struct PrestoConnector;

impl PrestoConnector {
    /// Creates a new connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for PrestoConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>, DriverError> {
        let session = SessionSettings::from_params(params)?;

        let client = Client::builder()
            .build()
            .map_err(|e| DriverError::transport(format!("Failed to create HTTP client: {e}")))?;

        debug!(url = %session.statement_url, user = %session.user, "Presto connection ready");

        Ok(Box::new(PrestoConnection {
            client,
            session: Arc::new(session),
        }))
    }
}

/// A connection to a coordinator. The REST protocol is stateless, so this
/// only carries the HTTP client and session settings.
#[derive(Debug)]
pub struct PrestoConnection {
    client: Client,
    session: Arc<SessionSettings>,
}

impl Connection for PrestoConnection {
    fn cursor(&self) -> Box<dyn Cursor> {
        Box::new(PrestoCursor::new(self.client.clone(), Arc::clone(&self.session)))
    }
}

/// One page of the statement protocol.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: Option<String>,
    next_uri: Option<String>,
    #[serde(default)]
    columns: Option<Vec<ColumnDescriptor>>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    stats: Option<QueryStats>,
}

#[derive(Debug, Deserialize)]
struct QueryStats {
    #[serde(default)]
    state: String,
}

/// Cursor over the statement protocol.
#[derive(Debug)]
pub struct PrestoCursor {
    client: Client,
    session: Arc<SessionSettings>,
    next_uri: Mutex<Option<String>>,
}

impl PrestoCursor {
    fn new(client: Client, session: Arc<SessionSettings>) -> Self {
        Self {
            client,
            session,
            next_uri: Mutex::new(None),
        }
    }

    /// Builds the initial statement request.
    fn statement_request(&self, sql: &str) -> RequestBuilder {
        let session = &self.session;
        let mut request = self
            .client
            .post(session.statement_url.clone())
            .header(HEADER_USER, &session.user)
            .header(HEADER_SOURCE, &session.source)
            .header(HEADER_CATALOG, &session.catalog)
            .header(HEADER_SCHEMA, &session.schema)
            .body(sql.to_string());

        if !session.session_properties.is_empty() {
            let properties = session
                .session_properties
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(",");
            request = request.header(HEADER_SESSION, properties);
        }

        if !session.client_tags.is_empty() {
            request = request.header(HEADER_CLIENT_TAGS, session.client_tags.join(","));
        }

        if let Some(password) = &session.password {
            request = request.basic_auth(&session.user, Some(password));
        }

        request
    }

    /// Sends one protocol request and decodes the page.
    async fn fetch_page(&self, request: RequestBuilder) -> Result<QueryResults, DriverError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                DriverError::transport(format!("Failed to connect to coordinator: {e}"))
            } else {
                DriverError::transport(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DriverError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.parse_status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            DriverError::Other(anyhow::anyhow!("Failed to parse coordinator response: {e}"))
        })
    }

    fn parse_status_error(&self, status: StatusCode, body: &str) -> DriverError {
        if status == StatusCode::UNAUTHORIZED {
            return DriverError::transport(format!(
                "Authentication failed for user '{}'",
                self.session.user
            ));
        }

        let body = body.trim();
        if body.is_empty() {
            DriverError::transport(format!("Coordinator returned {status}"))
        } else {
            DriverError::transport(format!("Coordinator returned {status}: {body}"))
        }
    }

    fn set_next_uri(&self, uri: Option<String>) {
        *self
            .next_uri
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = uri;
    }

    fn take_next_uri(&self) -> Option<String> {
        self.next_uri
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

#[async_trait]
impl Cursor for PrestoCursor {
    async fn execute(&self, sql: &str) -> Result<QueryData, DriverError> {
        self.set_next_uri(None);

        let mut page = self.fetch_page(self.statement_request(sql)).await?;
        let mut columns: Option<Vec<ColumnDescriptor>> = None;
        let mut rows = Vec::new();

        loop {
            trace!(
                query_id = page.id.as_deref().unwrap_or("-"),
                state = page.stats.as_ref().map(|s| s.state.as_str()).unwrap_or("-"),
                "Received result page"
            );

            if let Some(error) = page.error.take() {
                self.set_next_uri(None);
                return Err(DriverError::Database(DatabaseError::Structured(error)));
            }

            if columns.is_none() {
                columns = page.columns.take();
            }
            if let Some(data) = page.data.take() {
                rows.extend(data);
            }

            self.set_next_uri(page.next_uri.clone());
            let Some(next_uri) = page.next_uri.take() else {
                break;
            };

            if !self.session.poll_interval.is_zero() {
                tokio::time::sleep(self.session.poll_interval).await;
            }
            page = self.fetch_page(self.client.get(next_uri)).await?;
        }

        Ok(QueryData {
            columns: columns.unwrap_or_default(),
            rows,
        })
    }

    async fn cancel(&self) {
        // Before the first page arrives there is no handle to cancel; the
        // coordinator abandons queries nobody polls.
        let Some(next_uri) = self.take_next_uri() else {
            debug!("No query in flight, nothing to cancel");
            return;
        };

        match self.client.delete(&next_uri).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(uri = %next_uri, "Cancelled query");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Coordinator rejected cancel request");
            }
            Err(e) => warn!("Failed to cancel query: {}", e),
        }
    }
}
