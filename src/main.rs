mod cli;
mod commands;
mod config;
mod output;
mod params;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Command::Module { args_file } => commands::module::run(&ctx, args_file.as_deref()),
        Command::Install(args) => commands::packages::install(&ctx, args),
        Command::Remove(args) => commands::packages::remove(&ctx, args),
        Command::List(args) => commands::packages::list(&ctx, args),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "ostreepkg", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
