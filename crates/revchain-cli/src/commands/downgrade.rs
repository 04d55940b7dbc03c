//! Downgrade command
//!
//! Usage: revchain downgrade TARGET [--dry-run]

use clap::Args;
use revchain_core::Target;
use revchain_engine::commands::engine_command::EngineCommand;

use crate::config::Settings;

#[derive(Debug, Args)]
pub struct DowngradeArgs {
    /// `base`, a revision (or unique prefix), or `-N`
    #[arg(allow_hyphen_values = true)]
    pub target: String,

    /// Print the plan without touching the database
    #[arg(long)]
    pub dry_run: bool,
}

pub fn execute(args: DowngradeArgs, settings: &Settings) -> anyhow::Result<()> {
    let target: Target = args.target.parse()?;
    super::migrate(
        settings,
        EngineCommand::Downgrade {
            target,
            dry_run: args.dry_run,
        },
    )
}
