//! Result normalization.
//!
//! Turns driver output into the canonical [`ResultSet`]: column names are made
//! unique, types go through [`map_presto_type`], and each positional row is
//! keyed by column name.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::driver::{ColumnDescriptor, QueryData};
use crate::types::{map_presto_type, Column, ResultSet, Row};

/// Builds canonical columns, renaming duplicates to `name1`, `name2`, ...
pub fn fetch_columns(descriptors: &[ColumnDescriptor]) -> Vec<Column> {
    let mut seen: HashSet<String> = HashSet::with_capacity(descriptors.len());
    let mut duplicates_counter = 1;

    descriptors
        .iter()
        .map(|descriptor| {
            let mut name = descriptor.name.clone();
            while seen.contains(&name) {
                name = format!("{}{}", descriptor.name, duplicates_counter);
                duplicates_counter += 1;
            }
            seen.insert(name.clone());
            Column::new(name, map_presto_type(&descriptor.type_name))
        })
        .collect()
}

/// Pairs a positional row with the columns. Short rows are padded with null;
/// surplus values are dropped.
pub fn zip_row(columns: &[Column], values: Vec<Value>) -> Row {
    if values.len() != columns.len() {
        debug!(
            expected = columns.len(),
            got = values.len(),
            "Row width does not match column count"
        );
    }

    let mut values = values.into_iter();
    columns
        .iter()
        .map(|column| (column.name.clone(), values.next().unwrap_or(Value::Null)))
        .collect()
}

/// Normalizes a completed query.
pub fn normalize(data: QueryData) -> ResultSet {
    let columns = fetch_columns(&data.columns);
    let rows = data
        .rows
        .into_iter()
        .map(|values| zip_row(&columns, values))
        .collect();

    ResultSet::new(columns, rows)
}
