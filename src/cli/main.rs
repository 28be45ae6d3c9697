//! CLI binary entry point for songplay-etl

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use songplay_warehouse::cli::commands::init::{InitArgs, handle_init_config};
#[cfg(feature = "cli")]
use songplay_warehouse::cli::commands::query::{QueryArgs, handle_query};
#[cfg(feature = "cli")]
use songplay_warehouse::cli::commands::run::{RunArgs, RunMode, handle_run};
#[cfg(feature = "cli")]
use songplay_warehouse::cli::commands::sql::{SqlArgs, handle_sql};
#[cfg(feature = "cli")]
use songplay_warehouse::cli::commands::status::{StatusArgs, handle_status};
#[cfg(feature = "cli")]
use songplay_warehouse::database::config::CONFIG_FILENAME;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "songplay-etl")]
#[command(about = "Load song-play logs and the song catalog into a star schema")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Log every statement's SQL
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Reset the schema, load staging and populate the star schema
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop and recreate every relation
    CreateTables {
        #[arg(long)]
        json: bool,
    },
    /// Load staging and populate the star schema without a reset (appends)
    Etl {
        #[arg(long)]
        json: bool,
    },
    /// Print every statement of a full pass without executing it
    Sql {
        /// SQL dialect (redshift, duckdb); defaults to the configured backend
        #[arg(short, long)]
        dialect: Option<String>,
    },
    /// Show row counts per relation
    Status {
        /// Relations to count (e.g. songplays users); all when omitted
        relations: Vec<String>,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Execute a SQL query against the warehouse
    Query {
        /// SQL query to execute
        sql: String,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Write a sample configuration file
    InitConfig {
        /// Where to write it
        #[arg(default_value = CONFIG_FILENAME)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    songplay_warehouse::cli::init_tracing(cli.verbose);

    let config = cli.config;
    let run = |mode: RunMode, json: bool| {
        handle_run(&RunArgs {
            config: config.clone(),
            mode,
            json,
        })
    };

    let result = match cli.command.unwrap_or(Commands::Run { json: false }) {
        Commands::Run { json } => run(RunMode::Full, json),
        Commands::CreateTables { json } => run(RunMode::CreateTables, json),
        Commands::Etl { json } => run(RunMode::LoadAndTransform, json),
        Commands::Sql { dialect } => handle_sql(&SqlArgs {
            config: config.clone(),
            dialect,
        }),
        Commands::Status { relations, format } => handle_status(&StatusArgs {
            config: config.clone(),
            format,
            relations,
        }),
        Commands::Query { sql, format } => handle_query(&QueryArgs {
            sql,
            config: config.clone(),
            format,
        }),
        Commands::InitConfig { path, force } => handle_init_config(&InitArgs { path, force }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
