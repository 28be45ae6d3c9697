//! Row counts per relation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::{OutputFormat, QueryResult, format_query_result};
use crate::models::Relation;
use crate::schema::{RelationCount, SchemaManager};

use super::{config_dir, load_config, open_backend, runtime};

/// Status command arguments
#[derive(Debug, Clone)]
pub struct StatusArgs {
    pub config: PathBuf,
    pub format: String,
    /// Relation names to count; empty means all of them
    pub relations: Vec<String>,
}

pub fn handle_status(args: &StatusArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let base_dir = config_dir(&args.config);

    let output_format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;
    let relations = resolve_relations(&args.relations)?;

    let rt = runtime()?;
    rt.block_on(async {
        let backend = open_backend(&config, &base_dir).await?;
        let counts = SchemaManager::new(backend.dialect())
            .row_counts_of(backend.as_ref(), &relations)
            .await?;

        println!("{}", format_query_result(&counts_as_result(&counts), output_format));

        backend.close().await?;
        Ok::<(), CliError>(())
    })
}

fn resolve_relations(names: &[String]) -> Result<Vec<Relation>, CliError> {
    if names.is_empty() {
        return Ok(Relation::ALL.to_vec());
    }

    names
        .iter()
        .map(|name| {
            Relation::from_name(name).ok_or_else(|| {
                CliError::InvalidArgument(format!("Unknown relation: {}", name))
            })
        })
        .collect()
}

fn counts_as_result(counts: &[RelationCount]) -> QueryResult {
    QueryResult::new(
        vec!["relation".to_string(), "kind".to_string(), "rows".to_string()],
        counts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "relation": c.relation.name(),
                    "kind": c.relation.kind(),
                    "rows": c.rows,
                })
            })
            .collect(),
    )
}
