//! Output module for aggregating results and writing reports
//!
//! This module handles:
//! - Reducing classified records to run metrics
//! - Merging each record's flags with its passthrough fields
//! - Writing the JSON report and the markdown summary

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_metrics, RunMetrics};

use crate::input::Row;
use crate::probe::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Report column for the platform flag
pub const SHOPIFY_COLUMN: &str = "isShopify";
/// Report column for the liveness flag
pub const ACTIVE_COLUMN: &str = "isActive";
/// Report column for the password gate flag
pub const PASSWORD_COLUMN: &str = "isPasswordProtected";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a finished run reports
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub metrics: RunMetrics,
    /// One row per record: passthrough fields plus the three flags
    pub rows: Vec<Row>,
    /// Input rows that were never classified, verbatim
    pub unprocessed_rows: Vec<Row>,
}

impl RunReport {
    /// Attaches rows that were passed through without classification
    pub fn with_unprocessed_rows(mut self, rows: Vec<Row>) -> Self {
        self.unprocessed_rows = rows;
        self
    }
}

/// Aggregates records into metrics and merged output rows
///
/// Pure: no I/O. Output rows keep the record order.
pub fn aggregate(
    records: &[Record],
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> RunReport {
    let metrics = RunMetrics::compute(records, started_at, finished_at);
    let rows = records.iter().map(merge_record).collect();

    RunReport {
        metrics,
        rows,
        unprocessed_rows: Vec::new(),
    }
}

/// Passthrough fields of the record's task with the flags appended
pub fn merge_record(record: &Record) -> Row {
    let mut row = record.task.fields.clone();
    row.insert(
        SHOPIFY_COLUMN.to_string(),
        Value::Bool(record.result.is_shopify),
    );
    row.insert(
        ACTIVE_COLUMN.to_string(),
        Value::Bool(record.result.is_active),
    );
    row.insert(
        PASSWORD_COLUMN.to_string(),
        Value::Bool(record.result.is_password_protected),
    );
    row
}

/// Writes the report as pretty-printed JSON
pub fn write_json_report(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Task;
    use crate::probe::ProbeResult;
    use serde_json::json;

    fn record(id: &str, result: ProbeResult) -> Record {
        let mut task = Task::new(id, format!("{}.test", id));
        task.fields.insert("Record ID".to_string(), json!(id));
        task.fields.insert("Owner".to_string(), json!("Ada"));
        Record { task, result }
    }

    #[test]
    fn test_merge_record_keeps_passthrough_fields() {
        let row = merge_record(&record(
            "r-1",
            ProbeResult {
                is_shopify: true,
                is_active: true,
                is_password_protected: false,
            },
        ));

        assert_eq!(row["Record ID"], json!("r-1"));
        assert_eq!(row["Owner"], json!("Ada"));
        assert_eq!(row[SHOPIFY_COLUMN], json!(true));
        assert_eq!(row[ACTIVE_COLUMN], json!(true));
        assert_eq!(row[PASSWORD_COLUMN], json!(false));
    }

    #[test]
    fn test_aggregate() {
        let records = vec![
            record("a", ProbeResult::default()),
            record(
                "b",
                ProbeResult {
                    is_shopify: true,
                    is_active: false,
                    is_password_protected: false,
                },
            ),
        ];
        let now = Utc::now();

        let report = aggregate(&records, now, now);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1]["Record ID"], json!("b"));
        assert_eq!(report.metrics.total_stores, 2);
        assert_eq!(report.metrics.shopify_stores, 1);
        assert!(report.unprocessed_rows.is_empty());
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let now = Utc::now();

        let mut bad_row = Row::new();
        bad_row.insert("Note".to_string(), json!("missing url"));
        let report = aggregate(&[record("a", ProbeResult::default())], now, now)
            .with_unprocessed_rows(vec![bad_row]);

        write_json_report(&report, &path).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["metrics"]["totalStores"], json!(1));
        assert_eq!(written["rows"][0][SHOPIFY_COLUMN], json!(false));
        assert_eq!(written["unprocessedRows"][0]["Note"], json!("missing url"));
    }
}
