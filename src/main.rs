//! # DataSynergy CLI (`dsyn`)
//!
//! ## Usage
//!
//! ```bash
//! dsyn --config ./config/dsyn.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dsyn sources` | List registered data sources |
//! | `dsyn get <id>` | Show one source as JSON |
//! | `dsyn add <name> <kind>` | Register a source |
//! | `dsyn test-connection <kind>` | Test credentials |
//! | `dsyn schemas <id>` | Print recorded schemas |
//! | `dsyn export-schema <id>` | Export schemas as JSON |
//! | `dsyn query <id> "<sql>"` | Execute a query |
//! | `dsyn optimize "<sql>"` | Advisory query rewrite |
//! | `dsyn quality <id>` | Quality report |
//! | `dsyn ask "<question>"` | Natural-language question |
//! | `dsyn refresh` | Refresh every source |
//! | `dsyn set-status <id> <status>` | Maintenance / disconnect |
//! | `dsyn reconnect <id>` | Re-test stored credentials |
//! | `dsyn samples <kind>` | Sample queries for a kind |
//! | `dsyn insights` | Insight feed |
//! | `dsyn dashboard` | Dashboard summary |
//! | `dsyn serve` | Start the HTTP API |
//! | `dsyn completions <shell>` | Shell completion script |
//!
//! Every invocation builds a fresh in-memory registry (seeded with the demo
//! sources unless `simulation.seed_demo_data = false`), so changes made by
//! one command are not visible to the next. Run `dsyn serve` for a
//! long-lived registry.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use datasynergy::commands;
use datasynergy::config;
use datasynergy::logging::init_logger;
use datasynergy::models::{ConnectionCredentials, DataSourceKind, SourceDraft};
use datasynergy::server;
use datasynergy::DataService;

/// DataSynergy data service: registry, queries, quality and natural-language
/// answers over simulated data sources.
#[derive(Parser)]
#[command(name = "dsyn", version)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/dsyn.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Connection fields shared by `add` and `test-connection`.
#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Full connection string, used instead of host/port.
    #[arg(long)]
    connection_string: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    /// Require SSL.
    #[arg(long)]
    ssl: bool,
    /// Connection attempt timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

impl CredentialArgs {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.connection_string.is_none() && self.api_key.is_none()
    }

    fn into_credentials(self) -> ConnectionCredentials {
        ConnectionCredentials {
            host: self.host,
            port: self.port,
            database: self.database,
            username: self.username,
            password: self.password,
            connection_string: self.connection_string,
            api_key: self.api_key,
            use_ssl: self.ssl.then_some(true),
            timeout: self.timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List registered data sources.
    Sources,

    /// Show one data source as JSON (credentials redacted).
    Get { id: String },

    /// Register a data source.
    Add {
        name: String,
        /// Kind: mysql, postgresql, mongodb, oracle, sqlserver, sqlite, csv, api, snowflake.
        kind: String,
        /// Icon hint; defaults to the kind's icon.
        #[arg(long)]
        icon: Option<String>,
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Test credentials for a kind without registering anything.
    TestConnection {
        kind: String,
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Print the recorded schemas of a source.
    Schemas { id: String },

    /// Export the schemas of a source as JSON.
    ExportSchema {
        id: String,
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Execute a query against a source.
    Query {
        id: String,
        query: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Suggest an optimized form of a query.
    Optimize {
        query: String,
        /// Source whose schema informs the rewrite.
        #[arg(long)]
        source: Option<String>,
    },

    /// Analyze the quality of a source.
    Quality { id: String },

    /// Ask a natural-language question.
    Ask {
        query: String,
        /// Print the raw JSON answer.
        #[arg(long)]
        json: bool,
    },

    /// Refresh every source not under maintenance.
    Refresh,

    /// Set a source to `maintenance` or `disconnected`.
    SetStatus {
        id: String,
        status: String,
        #[arg(long)]
        message: Option<String>,
    },

    /// Re-test a source's stored credentials.
    Reconnect { id: String },

    /// Sample queries for a kind.
    Samples { kind: String },

    /// Print the insight feed.
    Insights,

    /// Print the dashboard summary.
    Dashboard,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Generate a shell completion script.
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "dsyn", &mut std::io::stdout());
        return Ok(());
    }

    init_logger(cli.verbose);
    let cfg = config::load_config_or_default(&cli.config)?;

    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let service = DataService::from_config(&cfg)?;

    match cli.command {
        Commands::Sources => commands::run_sources(&service).await?,
        Commands::Get { id } => commands::run_get(&service, &id).await?,
        Commands::Add {
            name,
            kind,
            icon,
            credentials,
        } => {
            let kind: DataSourceKind = kind.parse()?;
            let mut draft = SourceDraft::new(&name, kind);
            if kind.requires_credentials() || !credentials.is_empty() {
                draft = draft.with_credentials(credentials.into_credentials());
            }
            draft.icon = icon;
            commands::run_add(&service, draft).await?;
        }
        Commands::TestConnection { kind, credentials } => {
            commands::run_test_connection(&service, &kind, credentials.into_credentials()).await?;
        }
        Commands::Schemas { id } => commands::run_schemas(&service, &id).await?,
        Commands::ExportSchema { id, output } => {
            commands::run_export_schema(&service, &id, output.as_deref()).await?;
        }
        Commands::Query { id, query, json } => {
            commands::run_query(&service, &id, &query, json).await?;
        }
        Commands::Optimize { query, source } => {
            commands::run_optimize(&service, &query, source.as_deref()).await?;
        }
        Commands::Quality { id } => commands::run_quality(&service, &id).await?,
        Commands::Ask { query, json } => commands::run_ask(&service, &query, json).await?,
        Commands::Refresh => commands::run_refresh(&service).await?,
        Commands::SetStatus {
            id,
            status,
            message,
        } => commands::run_set_status(&service, &id, &status, message).await?,
        Commands::Reconnect { id } => commands::run_reconnect(&service, &id).await?,
        Commands::Samples { kind } => commands::run_samples(&service, &kind)?,
        Commands::Insights => commands::run_insights(&service)?,
        Commands::Dashboard => commands::run_dashboard(&service).await?,
        Commands::Serve | Commands::Completions { .. } => {
            // Handled above
            unreachable!()
        }
    }

    Ok(())
}
