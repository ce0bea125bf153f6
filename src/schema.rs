//! Schema introspection.
//!
//! Discovers tables and columns by querying the engine's `system.jdbc.columns`
//! catalog table and folding the flat rows into one entry per `schema.table`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PrestoConfig;
use crate::driver::Connection;
use crate::error::{Result, RunnerError};
use crate::query::{ExecutionOutcome, QueryExecutor};
use crate::types::ResultSet;

/// A table and its columns, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Qualified `schema.table` name.
    pub name: String,

    /// Column names. Duplicates are kept as reported.
    pub columns: Vec<String>,
}

impl SchemaEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }
}

/// Builds the catalog metadata query for `catalog`, restricted to
/// `schema.table` names matching `table_filter`.
pub fn metadata_query(catalog: &str, table_filter: &str) -> String {
    format!(
        "SELECT table_schem, table_name, column_name \
         FROM system.jdbc.columns \
         WHERE table_cat = '{}' \
         AND regexp_like(concat(table_schem, '.', table_name), '{}')",
        quote_literal(catalog),
        quote_literal(table_filter)
    )
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Folds metadata rows into schema entries.
///
/// Tables appear in first-seen order, as do the columns within each table.
pub fn group_rows(result: &ResultSet) -> Vec<SchemaEntry> {
    let mut entries: Vec<SchemaEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in &result.rows {
        let table_name = format!(
            "{}.{}",
            cell_text(row.get("table_schem")),
            cell_text(row.get("table_name"))
        );
        let column = cell_text(row.get("column_name"));

        let position = *index.entry(table_name.clone()).or_insert_with(|| {
            entries.push(SchemaEntry::new(table_name));
            entries.len() - 1
        });
        entries[position].columns.push(column);
    }

    entries
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Lists the tables visible through `config.catalog`.
///
/// Any outcome other than success becomes [`RunnerError::Schema`]; the
/// underlying message is logged and dropped.
pub async fn introspect(
    executor: &QueryExecutor,
    connection: &dyn Connection,
    config: &PrestoConfig,
    cancel: &CancellationToken,
) -> Result<Vec<SchemaEntry>> {
    let sql = metadata_query(&config.catalog, &config.table_filter);

    match executor.execute(connection, &sql, cancel).await {
        ExecutionOutcome::Success(result) => {
            let entries = group_rows(&result);
            debug!(
                catalog = %config.catalog,
                tables = entries.len(),
                "Schema introspected"
            );
            Ok(entries)
        }
        outcome => {
            warn!(
                "Schema introspection of catalog '{}' failed: {}",
                config.catalog,
                outcome.error_message().unwrap_or_default()
            );
            Err(RunnerError::Schema)
        }
    }
}
