//! Mock engine driver for testing.
//!
//! Provides a scripted in-memory connector that answers queries with canned
//! responses and counts the connections and cursors it hands out.

use super::{
    ColumnDescriptor, Connection, Connector, Cursor, DatabaseError, DriverError, QueryData,
};
use crate::connection::ConnectParams;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Canned answer for a query.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Completes with the given data.
    Rows(QueryData),
    /// Fails with a structured engine error object.
    EngineError(Value),
    /// Fails with a bare engine message.
    EngineMessage(String),
    /// Fails at the transport level.
    Transport(String),
    /// Fails with an unexpected error.
    Unexpected(String),
    /// Never completes; only cancellation ends the query.
    Pending,
}

impl MockResponse {
    /// Builds a `Rows` response from `(name, engine type)` pairs and positional rows.
    pub fn rows(columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> Self {
        Self::Rows(QueryData {
            columns: columns
                .iter()
                .map(|(name, type_name)| ColumnDescriptor::new(*name, *type_name))
                .collect(),
            rows,
        })
    }

    fn into_result(self) -> Option<Result<QueryData, DriverError>> {
        match self {
            Self::Rows(data) => Some(Ok(data)),
            Self::EngineError(payload) => Some(Err(DriverError::Database(
                DatabaseError::Structured(payload),
            ))),
            Self::EngineMessage(message) => {
                Some(Err(DriverError::Database(DatabaseError::Message(message))))
            }
            Self::Transport(message) => Some(Err(DriverError::Transport(message))),
            Self::Unexpected(message) => Some(Err(DriverError::Other(anyhow::anyhow!(message)))),
            Self::Pending => None,
        }
    }
}

/// Counters shared between a [`MockConnector`] and everything it creates.
#[derive(Debug, Default)]
pub struct MockStats {
    connections_opened: AtomicUsize,
    open_connections: AtomicUsize,
    cursors_created: AtomicUsize,
    open_cursors: AtomicUsize,
    cancels: AtomicUsize,
    executed: Mutex<Vec<String>>,
    last_params: Mutex<Option<ConnectParams>>,
}

impl MockStats {
    /// Total connections handed out.
    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::SeqCst)
    }

    /// Connections not yet dropped.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Total cursors handed out.
    pub fn cursors_created(&self) -> usize {
        self.cursors_created.load(Ordering::SeqCst)
    }

    /// Cursors not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of cancel requests received.
    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// SQL statements executed, in order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    /// Parameters of the most recent connection attempt.
    pub fn last_params(&self) -> Option<ConnectParams> {
        lock(&self.last_params).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct Script {
    rules: Vec<(String, MockResponse)>,
    fallback: MockResponse,
}

impl Script {
    /// First rule whose needle occurs in the SQL wins.
    fn response_for(&self, sql: &str) -> MockResponse {
        self.rules
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// A scripted connector.
pub struct MockConnector {
    rules: Vec<(String, MockResponse)>,
    fallback: MockResponse,
    refusal: Option<String>,
    available: bool,
    stats: Arc<MockStats>,
}

impl MockConnector {
    /// Creates a connector that answers every query with an empty result.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: MockResponse::Rows(QueryData::default()),
            refusal: None,
            available: true,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Answers queries containing `needle` with `response`.
    pub fn respond(mut self, needle: impl Into<String>, response: MockResponse) -> Self {
        self.rules.push((needle.into(), response));
        self
    }

    /// Sets the answer for queries no rule matches.
    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Makes every connection attempt fail at the transport level.
    pub fn refuse_connections(mut self, message: impl Into<String>) -> Self {
        self.refusal = Some(message.into());
        self
    }

    /// Makes the connector report the client library as unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Returns the shared counters.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>, DriverError> {
        *lock(&self.stats.last_params) = Some(params.clone());

        if let Some(message) = &self.refusal {
            return Err(DriverError::transport(message.clone()));
        }

        self.stats.connections_opened.fetch_add(1, Ordering::SeqCst);
        self.stats.open_connections.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            script: Arc::new(Script {
                rules: self.rules.clone(),
                fallback: self.fallback.clone(),
            }),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockConnection {
    script: Arc<Script>,
    stats: Arc<MockStats>,
}

impl Connection for MockConnection {
    fn cursor(&self) -> Box<dyn Cursor> {
        self.stats.cursors_created.fetch_add(1, Ordering::SeqCst);
        self.stats.open_cursors.fetch_add(1, Ordering::SeqCst);
        Box::new(MockCursor {
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
        })
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.stats.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MockCursor {
    script: Arc<Script>,
    stats: Arc<MockStats>,
}

#[async_trait]
impl Cursor for MockCursor {
    async fn execute(&self, sql: &str) -> Result<QueryData, DriverError> {
        lock(&self.stats.executed).push(sql.to_string());

        match self.script.response_for(sql).into_result() {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn cancel(&self) {
        self.stats.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockCursor {
    fn drop(&mut self) {
        self.stats.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}
