//! Bulk-copy statement descriptors

use serde::Serialize;

use crate::database::statement::quote_literal;
use crate::database::{Dialect, Statement, StatementKind, WarehouseError, WarehouseResult};
use crate::models::{Relation, RelationKind};

/// Delegated access role the warehouse assumes to read the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IamRole(String);

impl IamRole {
    /// Wrap a role ARN, dropping surrounding quotes and whitespace
    pub fn new(arn: impl AsRef<str>) -> Self {
        Self(
            arn.as_ref()
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .to_string(),
        )
    }

    pub fn arn(&self) -> &str {
        &self.0
    }
}

/// How JSON fields are mapped onto staging columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "uri", rename_all = "snake_case")]
pub enum JsonFormat {
    /// Match top-level keys to column names
    Auto,
    /// Map fields through a JSONPaths document, positionally by column
    JsonPaths(String),
}

impl JsonFormat {
    pub fn from_jsonpaths(uri: Option<&str>) -> Self {
        match uri {
            Some(uri) if !uri.trim().is_empty() => JsonFormat::JsonPaths(uri.trim().to_string()),
            _ => JsonFormat::Auto,
        }
    }
}

/// One bulk load: an object-store prefix into a staging relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopySpec {
    pub relation: Relation,
    /// Object-store prefix (Redshift) or local file glob (DuckDB)
    pub source: String,
    pub credentials: IamRole,
    pub format: JsonFormat,
    pub region: String,
}

impl CopySpec {
    /// Render the load statement for `dialect`
    ///
    /// Fails when the target is not a staging relation or any literal
    /// contains characters that cannot be quoted.
    pub fn render(&self, dialect: Dialect) -> WarehouseResult<Statement> {
        if self.relation.kind() != RelationKind::Staging {
            return Err(WarehouseError::InvalidInput(format!(
                "bulk loads target staging relations only, not {}",
                self.relation
            )));
        }

        let sql = match dialect {
            Dialect::Redshift => self.render_redshift()?,
            Dialect::DuckDb => self.render_duckdb()?,
        };

        Ok(Statement::new(self.relation, StatementKind::Copy, sql))
    }

    fn render_redshift(&self) -> WarehouseResult<String> {
        let format = match &self.format {
            JsonFormat::Auto => quote_literal("auto")?,
            JsonFormat::JsonPaths(uri) => quote_literal(uri)?,
        };

        Ok(format!(
            "COPY {} FROM {}\nCREDENTIALS {}\nJSON {}\nREGION {}",
            self.relation.ident(),
            quote_literal(&self.source)?,
            quote_literal(&format!("aws_iam_role={}", self.credentials.arn()))?,
            format,
            quote_literal(&self.region)?,
        ))
    }

    /// DuckDB reads local files by key name; credentials and region do not apply
    fn render_duckdb(&self) -> WarehouseResult<String> {
        if let JsonFormat::JsonPaths(uri) = &self.format {
            tracing::debug!(
                relation = %self.relation,
                "Ignoring JSONPaths document {} for local load; fields match by name",
                uri
            );
        }

        let columns = self.relation.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();

        // String-encoded columns are read as text and cast after blanking empties
        let projection: Vec<String> = columns
            .iter()
            .map(|c| {
                if c.blank_as_null {
                    format!(
                        "TRY_CAST(NULLIF({}, '') AS {})",
                        c.name,
                        c.column_type.sql(Dialect::DuckDb)
                    )
                } else {
                    c.name.to_string()
                }
            })
            .collect();
        let types: Vec<String> = columns
            .iter()
            .map(|c| -> WarehouseResult<String> {
                let read_as = if c.blank_as_null {
                    "VARCHAR".to_string()
                } else {
                    c.column_type.sql(Dialect::DuckDb)
                };
                Ok(format!("{}: {}", quote_literal(c.name)?, quote_literal(&read_as)?))
            })
            .collect::<WarehouseResult<_>>()?;

        Ok(format!(
            "INSERT INTO {} ({})\nSELECT {}\nFROM read_json({}, columns = {{{}}})",
            self.relation.ident(),
            names.join(", "),
            projection.join(", "),
            quote_literal(&self.source)?,
            types.join(", "),
        ))
    }
}
