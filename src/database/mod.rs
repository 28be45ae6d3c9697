//! Warehouse backend abstraction
//!
//! This module provides the connection layer the pipeline runs on:
//! - Redshift: the production warehouse, reached over the Postgres wire protocol
//! - DuckDB: embedded database for local runs and tests
//!
//! Backends execute one [`Statement`] at a time. There is no transaction
//! spanning statements: each one commits on its own, so a failed run leaves
//! every statement before it in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "redshift-backend")]
pub mod redshift;

pub mod config;
pub mod statement;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbBackend;

#[cfg(feature = "redshift-backend")]
pub use self::redshift::RedshiftBackend;

pub use config::{BackendType, PipelineConfig};
pub use statement::{Dialect, Statement, StatementKind};

/// Error type for warehouse operations
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Failed to connect to, or lost, the warehouse session
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement or query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for warehouse operations
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Integer value of `column` in the first row, if any
    pub fn first_i64(&self, column: &str) -> Option<i64> {
        let value = self.rows.first()?.get(column)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

/// Warehouse backend trait
///
/// All operations are async. Callers await each statement before issuing the
/// next; implementations never batch or reorder.
#[async_trait(?Send)]
pub trait WarehouseBackend: Send + Sync {
    /// Dialect statements must be rendered in for this backend
    fn dialect(&self) -> Dialect;

    /// Execute a single DDL/DML statement and commit it
    ///
    /// # Returns
    /// Number of rows affected (0 for DDL)
    async fn execute(&self, statement: &Statement) -> WarehouseResult<u64>;

    /// Execute a SQL query and return results
    async fn query(&self, sql: &str) -> WarehouseResult<QueryResult>;

    /// Check if the warehouse session is usable
    async fn health_check(&self) -> WarehouseResult<bool>;

    /// Get the backend type name ("redshift" or "duckdb")
    fn backend_type(&self) -> &'static str;

    /// Close the connection
    async fn close(&self) -> WarehouseResult<()>;
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    output.push_str(&result.columns.join(","));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .map(|col| match row.get(col).unwrap_or(&serde_json::Value::Null) {
                serde_json::Value::String(s)
                    if s.contains(',') || s.contains('"') || s.contains('\n') =>
                {
                    format!("\"{}\"", s.replace('"', "\"\""))
                }
                serde_json::Value::Null => String::new(),
                other => display_value(other),
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|col| display_value(row.get(col).unwrap_or(&serde_json::Value::Null)))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let render = |values: &[String]| -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:width$}", v, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut output = String::new();
    output.push_str(&render(&result.columns));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &cells {
        output.push_str(&render(row));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_str("unknown").is_err());
    }

    #[test]
    fn test_first_i64() {
        let result = QueryResult::new(
            vec!["row_count".to_string()],
            vec![serde_json::json!({"row_count": 42})],
        );
        assert_eq!(result.first_i64("row_count"), Some(42));
        assert_eq!(result.first_i64("missing"), None);

        let textual = QueryResult::new(
            vec!["row_count".to_string()],
            vec![serde_json::json!({"row_count": "7"})],
        );
        assert_eq!(textual.first_i64("row_count"), Some(7));
        assert_eq!(QueryResult::empty().first_i64("row_count"), None);
    }

    #[test]
    fn test_format_as_table() {
        let result = QueryResult::new(
            vec!["relation".to_string(), "rows".to_string()],
            vec![
                serde_json::json!({"relation": "songplays", "rows": 6820}),
                serde_json::json!({"relation": "users", "rows": null}),
            ],
        );

        let output = format_as_table(&result);
        assert!(output.contains("relation"));
        assert!(output.contains("songplays"));
        assert!(output.contains("null"));
        assert!(output.contains("(2 rows)"));
    }

    #[test]
    fn test_format_as_csv() {
        let result = QueryResult::new(
            vec!["location".to_string(), "level".to_string()],
            vec![
                serde_json::json!({"location": "Klamath Falls, OR", "level": "free"}),
                serde_json::json!({"location": null, "level": "paid"}),
            ],
        );

        let output = format_as_csv(&result);
        assert!(output.contains("location,level"));
        assert!(output.contains("\"Klamath Falls, OR\",free"));
        assert!(output.contains("\n,paid\n"));
    }
}
