//! Column model for warehouse relations

use serde::Serialize;

use crate::database::statement::Dialect;

/// Logical column type, rendered per dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Variable-length string with a byte limit
    VarChar(u16),
    /// Fixed-length string
    Char(u8),
    Integer,
    BigInt,
    /// 8-byte floating point
    Double,
    /// Fixed point with precision and scale
    Decimal(u8, u8),
}

impl ColumnType {
    /// Render the type for column definitions
    ///
    /// DuckDB ignores string length limits, so both string types collapse to
    /// `VARCHAR` there. The same rendering is used for `read_json` column maps.
    pub fn sql(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (ColumnType::VarChar(len), Dialect::Redshift) => format!("VARCHAR({})", len),
            (ColumnType::Char(len), Dialect::Redshift) => format!("CHAR({})", len),
            (ColumnType::VarChar(_) | ColumnType::Char(_), Dialect::DuckDb) => {
                "VARCHAR".to_string()
            }
            (ColumnType::Integer, _) => "INTEGER".to_string(),
            (ColumnType::BigInt, _) => "BIGINT".to_string(),
            (ColumnType::Double, Dialect::Redshift) => "DOUBLE PRECISION".to_string(),
            (ColumnType::Double, Dialect::DuckDb) => "DOUBLE".to_string(),
            (ColumnType::Decimal(precision, scale), _) => {
                format!("DECIMAL({},{})", precision, scale)
            }
        }
    }
}

/// A column of a warehouse relation
///
/// Column definitions are static: the schema is fixed at compile time and
/// rendered into DDL and load statements by dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Column name as it appears in the warehouse
    pub name: &'static str,
    /// Logical type
    pub column_type: ColumnType,
    /// Whether the column allows NULL values
    pub nullable: bool,
    /// Whether the warehouse generates the value (surrogate key)
    pub identity: bool,
    /// Source JSON may carry the value as a string, empty when absent
    pub blank_as_null: bool,
}

impl ColumnDef {
    /// Create a nullable column
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            identity: false,
            blank_as_null: false,
        }
    }

    /// Mark the column NOT NULL
    pub const fn not_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    /// Mark the column as a warehouse-generated surrogate key
    pub const fn identity(self) -> Self {
        Self {
            identity: true,
            nullable: false,
            ..self
        }
    }

    /// Accept string-encoded values on load; an empty string loads as NULL
    pub const fn blank_as_null(self) -> Self {
        Self {
            blank_as_null: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_rendering() {
        assert_eq!(ColumnType::VarChar(255).sql(Dialect::Redshift), "VARCHAR(255)");
        assert_eq!(ColumnType::VarChar(255).sql(Dialect::DuckDb), "VARCHAR");
        assert_eq!(ColumnType::Char(1).sql(Dialect::Redshift), "CHAR(1)");
        assert_eq!(ColumnType::Double.sql(Dialect::Redshift), "DOUBLE PRECISION");
        assert_eq!(ColumnType::Double.sql(Dialect::DuckDb), "DOUBLE");
        assert_eq!(ColumnType::Decimal(10, 5).sql(Dialect::DuckDb), "DECIMAL(10,5)");
    }

    #[test]
    fn test_column_builders() {
        let col = ColumnDef::new("user_id", ColumnType::Integer);
        assert!(col.nullable);

        let col = col.not_null();
        assert!(!col.nullable);
        assert!(!col.identity);

        let id = ColumnDef::new("songplay_id", ColumnType::BigInt).identity();
        assert!(id.identity);
        assert!(!id.nullable);

        let user = ColumnDef::new("userId", ColumnType::Integer).blank_as_null();
        assert!(user.blank_as_null);
        assert!(user.nullable);
    }
}
