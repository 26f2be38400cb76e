use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ostreepkg")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent package layering for rpm-ostree hosts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/ostreepkg/config.toml)
    #[arg(long, env = "OSTREEPKG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run as an automation module: JSON arguments in, JSON result out
    Module {
        /// File holding the JSON arguments ("-" or omitted reads stdin)
        args_file: Option<PathBuf>,
    },

    /// Layer packages onto the deployment
    Install(ChangeArgs),

    /// Remove layered packages
    #[command(alias = "uninstall")]
    Remove(ChangeArgs),

    /// List installed packages
    List(ListArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every package operation.
#[derive(Args, Clone, Default)]
pub struct CommonArgs {
    /// Report what would happen without touching the system
    #[arg(long)]
    pub check: bool,

    /// Root the rpm database is read from
    #[arg(long, value_name = "PATH")]
    pub installroot: Option<PathBuf>,

    /// Print the JSON result instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ChangeArgs {
    /// Package names (comma-separated lists are accepted)
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct ListArgs {
    /// "installed" for every package, or a package name
    #[arg(default_value = "installed")]
    pub scope: String,

    #[command(flatten)]
    pub common: CommonArgs,
}
