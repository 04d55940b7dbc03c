//! revchain CLI
//!
//! Command-line interface for the migration ledger

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use config::{LogFormat, Settings};

#[derive(Debug, Parser)]
#[command(name = "revchain")]
#[command(about = "revchain - Versioned schema migrations over a revision chain", long_about = None)]
struct Cli {
    /// SQLite database to migrate
    #[arg(long, global = true, env = "REVCHAIN_DATABASE")]
    database: Option<PathBuf>,

    /// Directory holding the revision files
    #[arg(long, global = true, env = "REVCHAIN_MIGRATIONS")]
    migrations: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, env = "REVCHAIN_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    /// Optional TOML config file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply revisions up to a target (default: head)
    Upgrade(commands::upgrade::UpgradeArgs),
    /// Undo revisions back to a target
    Downgrade(commands::downgrade::DowngradeArgs),
    /// Print the revision the database is at
    Current,
    /// List revisions in application order
    History,
    /// List head revisions with their branch labels
    Heads,
    /// Print one revision
    Show(commands::show::ShowArgs),
    /// Verify chain, reversibility and stored checksums
    Check,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        config::CliOverrides {
            database: cli.database,
            migrations: cli.migrations,
            log_format: cli.log_format,
        },
        &cli.config,
    )?;
    revchain_core::logging_facility::init(settings.log_format.profile());
    tracing::debug!(
        database = %settings.database.display(),
        migrations = %settings.migrations.display(),
        "settings resolved"
    );

    match cli.command {
        Commands::Upgrade(args) => commands::upgrade::execute(args, &settings),
        Commands::Downgrade(args) => commands::downgrade::execute(args, &settings),
        Commands::Current => commands::current::execute(&settings),
        Commands::History => commands::history::execute(&settings),
        Commands::Heads => commands::heads::execute(&settings),
        Commands::Show(args) => commands::show::execute(args, &settings),
        Commands::Check => commands::check::execute(&settings),
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
