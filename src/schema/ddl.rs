//! DDL rendering for the staging and star-schema relations

use crate::database::{Dialect, Statement, StatementKind};
use crate::models::{ColumnDef, Distribution, Relation};

/// Sequence backing `songplays.songplay_id` where the dialect has no IDENTITY
pub const SONGPLAY_ID_SEQUENCE: &str = "songplays_songplay_id_seq";

fn column_sql(column: &ColumnDef, dialect: Dialect) -> String {
    let mut sql = format!("    {} {}", column.name, column.column_type.sql(dialect));

    if column.identity {
        match dialect {
            Dialect::Redshift => sql.push_str(" IDENTITY(0,1)"),
            Dialect::DuckDb => {
                sql.push_str(&format!(" DEFAULT nextval('{}')", SONGPLAY_ID_SEQUENCE))
            }
        }
    }

    if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    sql
}

/// Table-level storage directives (Redshift only)
fn placement_sql(relation: Relation) -> String {
    let mut directives = Vec::new();

    match relation.distribution() {
        Distribution::Auto => {}
        Distribution::All => directives.push("DISTSTYLE ALL".to_string()),
        Distribution::Key(column) => {
            directives.push(format!("DISTSTYLE KEY DISTKEY ({})", column))
        }
    }

    if let Some(column) = relation.sort_key() {
        directives.push(format!("SORTKEY ({})", column));
    }

    if directives.is_empty() {
        String::new()
    } else {
        format!("\n{}", directives.join("\n"))
    }
}

fn has_identity(relation: Relation) -> bool {
    relation.columns().iter().any(|c| c.identity)
}

/// `DROP TABLE IF EXISTS` for one relation, plus its sequence on DuckDB
pub fn drop_statements(relation: Relation, dialect: Dialect) -> Vec<Statement> {
    let mut statements = vec![Statement::new(
        relation,
        StatementKind::Drop,
        format!("DROP TABLE IF EXISTS {}", relation.ident()),
    )];

    if dialect == Dialect::DuckDb && has_identity(relation) {
        statements.push(Statement::new(
            relation,
            StatementKind::Drop,
            format!("DROP SEQUENCE IF EXISTS {}", SONGPLAY_ID_SEQUENCE),
        ));
    }

    statements
}

/// `CREATE TABLE` for one relation, preceded by its sequence on DuckDB
pub fn create_statements(relation: Relation, dialect: Dialect) -> Vec<Statement> {
    let mut statements = Vec::new();

    if dialect == Dialect::DuckDb && has_identity(relation) {
        statements.push(Statement::new(
            relation,
            StatementKind::Create,
            format!("CREATE SEQUENCE {} START 1", SONGPLAY_ID_SEQUENCE),
        ));
    }

    let columns: Vec<String> = relation
        .columns()
        .iter()
        .map(|c| column_sql(c, dialect))
        .collect();

    let placement = match dialect {
        Dialect::Redshift => placement_sql(relation),
        Dialect::DuckDb => String::new(),
    };

    statements.push(Statement::new(
        relation,
        StatementKind::Create,
        format!(
            "CREATE TABLE {} (\n{}\n){}",
            relation.ident(),
            columns.join(",\n"),
            placement
        ),
    ));

    statements
}
