//! Typed statement descriptors
//!
//! Every statement the pipeline issues is a [`Statement`]: the relation it
//! targets, what kind of statement it is, and the rendered SQL text. Components
//! produce ordered `Vec<Statement>`s; the orchestrator only executes them and
//! never looks at dialect details.

use serde::{Deserialize, Serialize};

use super::{WarehouseError, WarehouseResult};
use crate::models::Relation;

/// SQL dialect statements are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Amazon Redshift (production warehouse)
    #[default]
    Redshift,
    /// Embedded DuckDB (local runs and tests)
    DuckDb,
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redshift" => Ok(Dialect::Redshift),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(format!(
                "Unknown SQL dialect: {}. Use 'redshift' or 'duckdb'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// What a statement does; decides which pipeline error a failure maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Drop,
    Create,
    /// Bulk load into a staging relation
    Copy,
    /// Insert-select into the star schema
    Insert,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::Drop => write!(f, "drop"),
            StatementKind::Create => write!(f, "create"),
            StatementKind::Copy => write!(f, "copy"),
            StatementKind::Insert => write!(f, "insert"),
        }
    }
}

/// A single DDL or DML statement, executed and committed on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Relation the statement targets
    pub relation: Relation,
    pub kind: StatementKind,
    /// Rendered SQL text
    pub sql: String,
}

impl Statement {
    pub fn new(relation: Relation, kind: StatementKind, sql: impl Into<String>) -> Self {
        Self {
            relation,
            kind,
            sql: sql.into(),
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{};", self.sql.trim_end().trim_end_matches(';'))
    }
}

/// Quote a value as a SQL string literal
///
/// Redshift `COPY` takes its source path, credentials and region as literals
/// and has no bind-parameter form, so every such value goes through here.
/// Control characters are rejected outright; single quotes are doubled.
pub fn quote_literal(value: &str) -> WarehouseResult<String> {
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(WarehouseError::InvalidInput(format!(
            "literal contains control character {:?}",
            c
        )));
    }
    Ok(format!("'{}'", value.replace('\'', "''")))
}
