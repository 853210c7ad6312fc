//! Input rows and task construction
//!
//! Rows are opaque JSON objects. The configured [`FieldMapping`] names the
//! identifier and URL fields; every other field is passthrough data that is
//! carried to the report unchanged.

use crate::InputError;
use serde_json::{Map, Value};
use std::path::Path;

pub use crate::config::FieldMapping;

/// One input row
pub type Row = Map<String, Value>;

/// A store to classify
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Row identifier, stringified
    pub id: String,
    /// Raw URL as found in the row
    pub url: String,
    /// Fields carried to the report (includes the identifier and URL fields)
    pub fields: Row,
}

impl Task {
    /// A task with no passthrough fields
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            fields: Row::new(),
        }
    }
}

/// Tasks built from a set of rows, plus rows that could not become tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBatch {
    pub tasks: Vec<Task>,
    /// Rows missing an identifier or URL, verbatim
    pub invalid_rows: Vec<Row>,
}

/// Splits rows into tasks and invalid rows
///
/// A row is invalid when its identifier or URL is missing, null, or blank.
/// String and numeric identifiers are accepted; numbers are stringified.
pub fn build_tasks(rows: Vec<Row>, mapping: &FieldMapping) -> TaskBatch {
    let mut batch = TaskBatch::default();

    for row in rows {
        let id = row.get(&mapping.id_field).and_then(scalar_text);
        let url = row.get(&mapping.url_field).and_then(scalar_text);

        match (id, url) {
            (Some(id), Some(url)) => {
                let fields = passthrough_fields(&row, mapping);
                batch.tasks.push(Task { id, url, fields });
            }
            _ => {
                tracing::warn!(
                    "Row without '{}' or '{}', passing through unclassified",
                    mapping.id_field,
                    mapping.url_field
                );
                batch.invalid_rows.push(row);
            }
        }
    }

    tracing::debug!(
        "Built {} tasks, {} invalid rows",
        batch.tasks.len(),
        batch.invalid_rows.len()
    );
    batch
}

/// Loads rows from a JSON file holding an array of objects
pub fn load_rows(path: &Path) -> Result<Vec<Row>, InputError> {
    let content = std::fs::read_to_string(path)?;
    parse_rows(&content)
}

/// Parses rows from JSON text holding an array of objects
pub fn parse_rows(content: &str) -> Result<Vec<Row>, InputError> {
    let items = match serde_json::from_str(content)? {
        Value::Array(items) => items,
        other => return Err(InputError::Shape(json_kind(&other).to_string())),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(InputError::Shape(format!(
                "an array containing {}",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn passthrough_fields(row: &Row, mapping: &FieldMapping) -> Row {
    match &mapping.passthrough {
        None => row.clone(),
        Some(keep) => row
            .iter()
            .filter(|(key, _)| {
                *key == &mapping.id_field || *key == &mapping.url_field || keep.contains(*key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
