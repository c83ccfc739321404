use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bmcbutler")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Configure and run commands on fleets of BMCs and chassis controllers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Butler configuration file (default: ~/.config/bmcbutler/bmcbutler.toml)
    #[arg(long, global = true, env = "BMCBUTLER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render and apply configuration to assets
    Configure(ConfigureArgs),

    /// Run a command on assets
    Execute(ExecuteArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ConfigureArgs {
    /// Configuration template to apply
    #[arg(long = "config-file", value_name = "PATH")]
    pub config_file: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args)]
pub struct ExecuteArgs {
    /// Command to run: bmc-reset, powercycle, firmware-update, firmware-version
    #[arg(long, value_name = "NAME")]
    pub command: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Which assets to act on, and how.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Comma separated serials to look up
    #[arg(long, value_name = "SERIALS")]
    pub serials: Option<String>,

    /// Comma separated BMC/CMC addresses
    #[arg(long, value_name = "IPS")]
    pub ips: Option<String>,

    /// Only chassis
    #[arg(long)]
    pub chassis: bool,

    /// Only servers
    #[arg(long)]
    pub servers: bool,

    /// Comma separated locations to manage (overrides the config file)
    #[arg(long, value_name = "LOCATIONS")]
    pub locations: Option<String>,

    /// Manage assets regardless of their location
    #[arg(long)]
    pub ignore_location: bool,

    /// Number of concurrent butlers
    #[arg(short, long)]
    pub butlers: Option<usize>,

    /// Show what would be done without touching any device
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Inventory source (overrides the config file)
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// CSV file with a bmcaddress column
    Csv,
    /// External node classifier
    #[default]
    Enc,
    /// Only the addresses given with --ips
    Iplist,
}
