//! Library module for the iaprofiler CLI.
//!
//! Argument parsing, credential sourcing and command dispatch live here so
//! they can be exercised by tests; `main.rs` only wires logging and exit
//! codes.

pub mod commands;
pub mod output;
pub mod password;

use clap::{ArgAction, Args, Parser, Subcommand};
use iaprofiler_core::{
    CatalogClient, ConnectionConfig, Credentials,
    config::{DEFAULT_ANALYSIS_DATABASE, DEFAULT_IGNORE_LABEL},
    error::redact_url,
    parse_server_address,
    transport::ExponentialBackoff,
};
use std::{path::PathBuf, sync::Arc};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "iaprofiler")]
#[command(about = "Column-profiling workflows against a metadata catalog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
iaprofiler - Automated column profiling for a metadata catalog

Discovers database and file assets, maintains profiling projects, runs and
polls column analysis, publishes results and manages the ignore-list label.

CREDENTIALS:
  The password is read from IA_PASSWORD, then from --password-file, and
  finally from an interactive prompt. It is never accepted as an argument.

EXAMPLES:
  iaprofiler --server ia.example.com:9443 --user admin discover \\
      --project \"Automated Profiling\" --description \"Nightly discovery\"
  iaprofiler analyze --project \"Automated Profiling\" DB1.SCH1.T1.* --wait
  iaprofiler status SCHED_123 --wait
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection and verbosity flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Catalog services address
    #[arg(long, global = true, env = "IA_SERVER", value_name = "HOST:PORT")]
    pub server: Option<String>,

    /// Catalog user
    #[arg(long, global = true, env = "IA_USER")]
    pub user: Option<String>,

    /// File holding the password (first line is used)
    #[arg(long, global = true, value_name = "FILE")]
    pub password_file: Option<PathBuf>,

    /// Verify the server's TLS certificate
    #[arg(long, global = true)]
    pub verify_certs: bool,

    /// Maximum concurrent requests to the catalog
    #[arg(long, global = true, default_value_t = 1)]
    pub max_connections: usize,

    /// Retry transient failures this many times with exponential backoff
    #[arg(long, global = true, default_value_t = 0)]
    pub retries: u32,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover assets and create or update a project from them
    Discover(DiscoverArgs),
    /// Run column analysis
    Analyze(AnalyzeArgs),
    /// Publish analysis results
    Publish(PublishArgs),
    /// Show the status of scheduled tasks
    Status(StatusArgs),
    /// List or run data rules
    Rules(RulesArgs),
    /// Create the ignore-list label
    IgnoreLabel(IgnoreLabelArgs),
    /// Rebuild the catalog search index
    Reindex(ReindexArgs),
}

/// Arguments of `discover`.
#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Project to create or update
    #[arg(long)]
    pub project: String,

    /// Project description, also used to find its workspace
    #[arg(long)]
    pub description: String,

    /// Concurrent branch requests per traversal level
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Label marking objects to skip
    #[arg(long, default_value = DEFAULT_IGNORE_LABEL)]
    pub ignore_label: String,

    /// Skip the file tree
    #[arg(long)]
    pub no_files: bool,

    /// Skip the database tree
    #[arg(long)]
    pub no_databases: bool,

    /// Write the project XML instead of committing it
    #[arg(long)]
    pub dry_run: bool,

    /// Where a dry run writes the project XML
    #[arg(short, long, value_name = "FILE", default_value = "project.xml", requires = "dry_run")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Project holding the targets
    #[arg(long)]
    pub project: String,

    /// Targets such as DB.SCHEMA.TABLE[.COLUMN] or HOST:FOLDER:FILE[:COLUMN]
    #[arg(value_name = "TARGET", conflicts_with = "all")]
    pub targets: Vec<String>,

    /// Analyze every table and file of the project
    #[arg(long)]
    pub all: bool,

    /// Only analyze targets whose last analysis is older than this
    #[arg(long, value_name = "MINUTES")]
    pub stale_after_minutes: Option<u32>,

    /// Also run data class analysis
    #[arg(long)]
    pub analyze_data_classes: bool,

    /// Wait for the analysis to finish
    #[arg(long)]
    pub wait: bool,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub poll_interval: u64,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Project holding the analysis results
    #[arg(long)]
    pub project: String,

    /// Targets whose tables are published
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Schedule ids returned by analyze or rules
    #[arg(value_name = "SCHEDULE_ID", required = true)]
    pub schedule_ids: Vec<String>,

    /// Poll until every task is finished
    #[arg(long)]
    pub wait: bool,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub poll_interval: u64,
}

#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Project holding the rules
    #[arg(long)]
    pub project: String,

    /// Rules to run; all executable rules when omitted
    #[arg(value_name = "RULE", conflicts_with = "list")]
    pub rules: Vec<String>,

    /// Only list the executable rules
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct IgnoreLabelArgs {
    /// Label name
    #[arg(long, default_value = DEFAULT_IGNORE_LABEL)]
    pub label: String,

    /// Also label the catalog's own analysis database
    #[arg(long)]
    pub include_analysis_db: bool,

    /// Name of the analysis database
    #[arg(long, default_value = DEFAULT_ANALYSIS_DATABASE, requires = "include_analysis_db")]
    pub analysis_db: String,
}

#[derive(Debug, Args)]
pub struct ReindexArgs {
    /// Assets read per batch
    #[arg(long, default_value_t = 25)]
    pub batch_size: u32,

    /// Documents sent to the search index per batch
    #[arg(long, default_value_t = 100)]
    pub solr_batch_size: u32,

    /// Upgrade the index schema
    #[arg(long)]
    pub upgrade: bool,

    /// Force a full rebuild
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub force: bool,
}

/// Builds the connection configuration from the global flags.
///
/// # Errors
/// Returns an error if `--server` is missing or malformed.
pub fn connection_config(global: &GlobalArgs) -> anyhow::Result<ConnectionConfig> {
    let server = global
        .server
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("catalog server required: set IA_SERVER or use --server"))?;
    let address = parse_server_address(server)?;

    let mut config = ConnectionConfig::from_address(&address)
        .with_accept_invalid_certs(!global.verify_certs)
        .with_max_connections(global.max_connections);
    if global.retries > 0 {
        config = config.with_retry_policy(Arc::new(ExponentialBackoff::with_max_retries(global.retries)));
    }
    config.validate()?;
    Ok(config)
}

/// Connects to the catalog named by the global flags.
///
/// # Errors
/// Returns an error if the server, user or password cannot be resolved.
pub fn connect(global: &GlobalArgs) -> anyhow::Result<CatalogClient> {
    let config = connection_config(global)?;
    let user = global
        .user
        .clone()
        .ok_or_else(|| anyhow::anyhow!("catalog user required: set IA_USER or use --user"))?;
    let password = password::resolve_password(global.password_file.as_deref())?;
    let client = CatalogClient::connect(&config, Credentials::new(user, Some(password.into_inner())))?;
    tracing::info!("Connected to {}", redact_url(&config.base_url()));
    Ok(client)
}

/// Connects and runs the selected subcommand.
///
/// # Errors
/// Returns any connection or command error.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let client = connect(&cli.global)?;
    commands::execute(&client, &cli.command).await
}
