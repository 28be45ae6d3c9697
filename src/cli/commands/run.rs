//! Pipeline run commands: full pass, schema reset, load and transform

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::pipeline::{PipelineError, PipelineOrchestrator, RunReport};

use super::{config_dir, load_config, open_backend, runtime};

/// What part of the pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Reset, load, transform
    Full,
    /// Reset only
    CreateTables,
    /// Load and transform without reset
    LoadAndTransform,
}

/// Run command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub mode: RunMode,
    /// Print the run report as JSON on stdout
    pub json: bool,
}

pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    config.validate().map_err(PipelineError::from)?;
    let base_dir = config_dir(&args.config);

    let rt = runtime()?;
    let report = rt.block_on(async {
        let backend = open_backend(&config, &base_dir).await?;
        let mut orchestrator = PipelineOrchestrator::new(&config, backend.as_ref())?;

        let result = match args.mode {
            RunMode::Full => orchestrator.run().await,
            RunMode::CreateTables => orchestrator.create_tables().await,
            RunMode::LoadAndTransform => orchestrator.load_and_transform().await,
        };

        if let Err(e) = backend.close().await {
            tracing::warn!("Failed to close warehouse session: {}", e);
        }

        result.map_err(CliError::from)
    })?;

    print_report(&report, args.json)
}

fn print_report(report: &RunReport, json: bool) -> Result<(), CliError> {
    if json {
        let output = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::IoError(format!("Failed to serialize report: {}", e)))?;
        println!("{}", output);
        return Ok(());
    }

    println!("Run {} finished: {}", report.run_id, report.final_state);
    for outcome in &report.outcomes {
        println!(
            "  {:<7} {:<15} {:>10} rows  {:>6}ms",
            outcome.kind.to_string(),
            outcome.relation.name(),
            outcome.rows_affected,
            outcome.elapsed_ms
        );
    }
    println!(
        "{} statements, {} rows, {}ms",
        report.outcomes.len(),
        report.total_rows(),
        report.duration_ms
    );

    Ok(())
}
