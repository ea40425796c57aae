//! StarDB CLI - Single entrypoint for catalog maintenance and queries
//!
//! Every command runs inside one database transaction, committed when the
//! command succeeds and rolled back when it fails.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    CheckCommand, DatasetCommand, GlobalOptions, IngestCommand, InstrumentsCommand, QueryCommand,
    SearchCommand, SourceCommand, TypesCommand,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "STARDB_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "STARDB_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    /// Configuration file (YAML)
    #[arg(long, env = "STARDB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Database connection URL, overriding the configuration file
    #[arg(long, env = "STARDB_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Table template document, overriding the built-in templates
    #[arg(long, env = "STARDB_TEMPLATES", global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage datatypes and their tables
    Types(TypesCommand),
    /// Manage instruments
    Instruments(InstrumentsCommand),
    /// Ingest a data package as a new source
    Ingest(IngestCommand),
    /// Manage sources
    Source(SourceCommand),
    /// Manage datasets
    Dataset(DatasetCommand),
    /// Query datasets and timeseries
    Query(QueryCommand),
    /// Positional searches
    Search(SearchCommand),
    /// Check that every star of a source has a datatype
    Check(CheckCommand),
}

/// Filter directives used when RUST_LOG is unset: this binary and every
/// stardb library at `level`, noisy dependencies at warn
fn default_filter(level: &str) -> String {
    let ours = [
        module_path!(),
        "stardb_core",
        "stardb_catalog",
        "stardb_database",
        "stardb_datapkg",
        "stardb_migrations",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level));
    let quiet = ["sea_orm_migration", "sqlx", "sea_orm", "hyper", "reqwest", "rustls"]
        .iter()
        .map(|target| format!("{}=warn", target));
    ours.chain(quiet).collect::<Vec<_>>().join(",")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.clone();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        tracing_subscriber::EnvFilter::new(default_filter(&log_level))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    let options = GlobalOptions {
        config: cli.config,
        database_url: cli.database_url,
        templates: cli.templates,
    };

    match cli.command {
        Commands::Types(cmd) => cmd.execute(&options),
        Commands::Instruments(cmd) => cmd.execute(&options),
        Commands::Ingest(cmd) => cmd.execute(&options),
        Commands::Source(cmd) => cmd.execute(&options),
        Commands::Dataset(cmd) => cmd.execute(&options),
        Commands::Query(cmd) => cmd.execute(&options),
        Commands::Search(cmd) => cmd.execute(&options),
        Commands::Check(cmd) => cmd.execute(&options),
    }
}
