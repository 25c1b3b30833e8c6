use anyhow::Result;
use clap::{error::ErrorKind, Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;

use pgfixtures::config::{Config, Overrides, Settings};
use pgfixtures::exit_codes;
use pgfixtures::output::{JsonError, Output};

/// Version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pgfixtures")]
#[command(version = VERSION)]
#[command(about = "Stand up and tear down PostgreSQL schema fixtures", long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Path to config file (default: ./pgfixtures.toml)
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,

    #[command(flatten)]
    server: ServerArgs,

    /// Minimal output (errors only)
    #[arg(long, global = true)]
    quiet: bool,

    /// Show SQL being executed
    #[arg(long, global = true)]
    verbose: bool,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServerArgs {
    /// Database server host (overrides PGFIXTURES_HOST and config)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database server port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Administrative user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Primary fixture database name
    #[arg(long = "database", global = true)]
    database: Option<String>,

    /// Foreign fixture database name
    #[arg(long = "foreign-database", global = true)]
    foreign_database: Option<String>,
}

impl From<&ServerArgs> for Overrides {
    fn from(args: &ServerArgs) -> Self {
        Overrides {
            host: args.host.clone(),
            port: args.port,
            user: args.user.clone(),
            database: args.database.clone(),
            foreign_database: args.foreign_database.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the server is reachable (exit 11 if not)
    Probe,
    /// Ensure a database exists (default: the primary fixture database)
    CreateDb {
        /// Database name
        name: Option<String>,
        /// Fail on any error other than "already exists"
        #[arg(long)]
        strict: bool,
    },
    /// Create the primary database if needed and build the baseline schema
    Setup,
    /// Drop everything the baseline schema created
    Teardown,
    /// Teardown followed by setup
    Reset,
    /// Manage the cross-database foreign environment
    Foreign {
        #[command(subcommand)]
        command: ForeignCommands,
    },
    /// Show user objects and foreign environment state
    Status,
}

#[derive(Subcommand)]
enum ForeignCommands {
    /// Build the foreign database, server, user mapping and foreign table
    Setup,
    /// Drop the foreign server, extension and foreign database
    Teardown,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before parsing CLI so env vars are available)
    let _ = dotenvy::dotenv();

    // Check for --json flag early (before full parsing) for error handling
    let json_mode = std::env::args().any(|arg| arg == "--json");

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if json_mode && !matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
            {
                JsonError::new("usage_error", e.to_string()).print();
                std::process::exit(2);
            }
            e.exit();
        }
    };

    let output = Output::new(cli.json, cli.quiet, cli.verbose);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => fail(&output, "config_error", e, exit_codes::CONFIG_ERROR),
    };

    match run(cli.command, &settings, &output).await {
        Ok(code) => std::process::exit(code),
        Err(e) => fail(&output, "operational_failure", e, exit_codes::OPERATIONAL_FAILURE),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config = Config::load(cli.config_path.as_deref())?;
    Settings::resolve(&config, &Overrides::from(&cli.server))
}

fn fail(output: &Output, code: &'static str, e: anyhow::Error, exit_code: i32) -> ! {
    if output.is_json() {
        JsonError::new(code, e.to_string())
            .with_details(format!("{e:#}"))
            .print();
    } else {
        eprintln!("{} {e:#}", "Error:".red());
    }
    std::process::exit(exit_code);
}

async fn run(command: Commands, settings: &Settings, out: &Output) -> Result<i32> {
    match command {
        Commands::Probe => commands::probe(settings, out).await,
        Commands::CreateDb { name, strict } => commands::create_db(settings, name, strict, out).await,
        Commands::Setup => commands::setup(settings, out).await,
        Commands::Teardown => commands::teardown(settings, out).await,
        Commands::Reset => commands::reset(settings, out).await,
        Commands::Foreign { command } => match command {
            ForeignCommands::Setup => commands::foreign_setup(settings, out).await,
            ForeignCommands::Teardown => commands::foreign_teardown(settings, out).await,
        },
        Commands::Status => commands::status(settings, out).await,
    }
}
