use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provisio")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Transactional provisioning of installable units into profiles", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a change request to a profile (rolled back on failure)
    Apply(ApplyArgs),

    /// Show the operands a change request would run
    Plan(PlanArgs),

    /// Inspect stored profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// List the configured phases and their weights
    Phases,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Change request file (TOML)
    pub request: PathBuf,

    /// Profile to change (defaults to the configured default profile)
    #[arg(short, long, env = "PROVISIO_PROFILE")]
    pub profile: Option<String>,

    /// Show the plan without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Change request file (TOML)
    pub request: PathBuf,

    /// Profile to plan against (defaults to the configured default profile)
    #[arg(short, long, env = "PROVISIO_PROFILE")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// List stored profiles
    List,

    /// Show properties and installed units of a profile
    Show {
        /// Profile id
        id: String,
    },
}
