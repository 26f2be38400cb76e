//! Human-facing package commands: install, remove, list.

use anyhow::{Result, bail};
use ostreekit::runner::CommandRunner;
use ostreekit::runner::system::SystemRunner;
use ostreekit::{Client, DesiredState, Outcome, State};
use std::process::ExitCode;

use crate::Context as AppContext;
use crate::cli::{ChangeArgs, CommonArgs, ListArgs};
use crate::config::Config;
use crate::output::{self, Payload};
use crate::params::split_names;
use crate::ui;

pub fn install(ctx: &AppContext, args: ChangeArgs) -> Result<ExitCode> {
    let desired = DesiredState::packages(State::Present, split_names(&args.names));
    run(ctx, &desired, &args.common)
}

pub fn remove(ctx: &AppContext, args: ChangeArgs) -> Result<ExitCode> {
    let desired = DesiredState::packages(State::Absent, split_names(&args.names));
    run(ctx, &desired, &args.common)
}

pub fn list(ctx: &AppContext, args: ListArgs) -> Result<ExitCode> {
    let desired = DesiredState::query(args.scope);
    run(ctx, &desired, &args.common)
}

fn run(ctx: &AppContext, desired: &DesiredState, common: &CommonArgs) -> Result<ExitCode> {
    if desired.names.is_empty() && desired.list_selector().is_none() {
        bail!("No package names given");
    }

    let config = Config::load(ctx.config.as_deref())?;
    let client = client(&config, common, Box::new(SystemRunner::new()));

    if !ctx.quiet && !common.json {
        if common.check {
            ui::dim("Check mode: nothing will be run");
        }
        if ctx.verbose > 0 {
            ui::dim(&format!(
                "Install root: {}",
                client.config().install_root.display()
            ));
        }
    }

    let result = client.reconcile(desired, common.check);
    Ok(report(ctx, desired, common, &result))
}

fn client(config: &Config, common: &CommonArgs, runner: Box<dyn CommandRunner>) -> Client {
    Client::with_runner(
        runner,
        config.package_manager_config(common.installroot.as_deref()),
    )
}

/// Print the result in the requested form and pick the exit code.
fn report(
    ctx: &AppContext,
    desired: &DesiredState,
    common: &CommonArgs,
    result: &ostreekit::Result<Outcome>,
) -> ExitCode {
    if common.json {
        let payload = match result {
            Ok(outcome) => Payload::success(outcome, &output::describe(desired)),
            Err(e) => Payload::from_error(e),
        };
        match payload.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                ui::error(&format!("Could not serialize result: {e}"));
                return ExitCode::FAILURE;
            }
        }
        return if payload.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    match result {
        Ok(outcome) => {
            output::render(outcome, ctx.quiet);
            ExitCode::SUCCESS
        }
        Err(e) => {
            output::render_error(e);
            ExitCode::FAILURE
        }
    }
}
