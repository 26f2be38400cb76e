//! Automation module entry point: JSON arguments in, one JSON result out.

use anyhow::{Context, Result};
use ostreekit::runner::CommandRunner;
use ostreekit::runner::system::SystemRunner;
use ostreekit::Client;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use crate::Context as AppContext;
use crate::config::Config;
use crate::output::{self, Payload};
use crate::params::ModuleArgs;

pub fn run(ctx: &AppContext, args_file: Option<&Path>) -> Result<ExitCode> {
    let payload = match load(ctx, args_file) {
        Ok((content, config)) => execute(&content, &config, Box::new(SystemRunner::new())),
        Err(e) => Payload::failure(format!("{e:#}")),
    };

    println!("{}", payload.to_json()?);
    Ok(if payload.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn load(ctx: &AppContext, args_file: Option<&Path>) -> Result<(String, Config)> {
    let content = read_args(args_file)?;
    let config = Config::load(ctx.config.as_deref())?;
    Ok((content, config))
}

fn read_args(args_file: Option<&Path>) -> Result<String> {
    match args_file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Could not read module arguments from {}", path.display())),
        _ => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Could not read module arguments from stdin")?;
            Ok(content)
        }
    }
}

/// Validate arguments, reconcile, and build the result payload.
pub fn execute(content: &str, config: &Config, runner: Box<dyn CommandRunner>) -> Payload {
    let request = match ModuleArgs::from_json(content).and_then(ModuleArgs::into_request) {
        Ok(request) => request,
        Err(e) => return Payload::failure(e.to_string()),
    };

    let client = Client::with_runner(
        runner,
        config.package_manager_config(request.installroot.as_deref()),
    );

    match client.reconcile(&request.desired, request.check_mode) {
        Ok(outcome) => Payload::success(&outcome, &output::describe(&request.desired)),
        Err(e) => {
            log::debug!("reconcile failed: {e}");
            Payload::from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostreekit::runner::mock::{Call, MockRunner};
    use std::io::Write;
    use std::sync::Arc;

    fn run_module(json: &str, runner: MockRunner) -> (Payload, Arc<MockRunner>) {
        let runner = Arc::new(runner);
        let payload = execute(json, &Config::default(), Box::new(Arc::clone(&runner)));
        (payload, runner)
    }

    #[test]
    fn test_install_changed() {
        let (payload, runner) = run_module(
            r#"{"name": "htop", "state": "present"}"#,
            MockRunner::new().respond(0, "Added:\n  htop\n", ""),
        );

        assert!(!payload.failed);
        assert!(payload.changed);
        assert_eq!(payload.reboot_required, Some(true));
        assert_eq!(payload.rc, Some(0));
        assert_eq!(payload.stdout.as_deref(), Some("Added:\n  htop"));
        assert_eq!(payload.original_message.as_deref(), Some("htop"));
        assert_eq!(runner.runs().len(), 1);
    }

    #[test]
    fn test_install_already_layered() {
        let (payload, _runner) = run_module(
            r#"{"name": ["htop"]}"#,
            MockRunner::new().respond(77, "No change.", ""),
        );

        assert!(!payload.failed);
        assert!(!payload.changed);
        assert_eq!(payload.rc, Some(0));
        assert_eq!(payload.reboot_required, Some(false));
    }

    #[test]
    fn test_remove_failure() {
        let (payload, _runner) = run_module(
            r#"{"name": "nope", "state": "absent"}"#,
            MockRunner::new().respond(1, "", "error: Package/capability 'nope' is not currently requested\n"),
        );

        assert!(payload.failed);
        assert!(!payload.changed);
        assert_eq!(payload.rc, Some(1));
        assert_eq!(
            payload.stderr.as_deref(),
            Some("error: Package/capability 'nope' is not currently requested")
        );
        let cmd = payload.cmd.unwrap();
        assert_eq!(cmd[1], "uninstall");
        assert_eq!(cmd.last().map(String::as_str), Some("nope"));
    }

    #[test]
    fn test_check_mode_runs_nothing() {
        let (payload, runner) = run_module(
            r#"{"name": "htop", "_ansible_check_mode": true}"#,
            MockRunner::new(),
        );

        assert!(!payload.failed);
        assert!(!payload.changed);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_query_not_installed() {
        let (payload, runner) = run_module(
            r#"{"list": "kernel-rt"}"#,
            MockRunner::new().respond(1, "package kernel-rt is not installed\n", ""),
        );

        assert!(!payload.failed);
        assert_eq!(payload.results, Some(Vec::new()));
        assert_eq!(payload.original_message.as_deref(), Some("kernel-rt"));
        assert!(
            runner
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Resolve { name, .. } if name == "rpm"))
        );
    }

    #[test]
    fn test_malformed_query_fails() {
        let (payload, _runner) = run_module(
            r#"{"list": "installed"}"#,
            MockRunner::new().respond(0, "not json,", ""),
        );

        assert!(payload.failed);
        assert!(payload.msg.unwrap().starts_with("malformed query output"));
        assert_eq!(payload.rc, None);
    }

    #[test]
    fn test_invalid_args_run_nothing() {
        let (payload, runner) = run_module(r#"{"name": "htop", "list": "installed"}"#, MockRunner::new());

        assert!(payload.failed);
        assert_eq!(
            payload.msg.as_deref(),
            Some("parameters are mutually exclusive: name|list")
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_tool() {
        let (payload, _runner) = run_module(r#"{"name": "htop"}"#, MockRunner::new().without_binaries());

        assert!(payload.failed);
        assert!(payload.msg.unwrap().contains("rpm-ostree"));
    }

    #[test]
    fn test_config_binary_override() {
        let config = Config::from_toml("rpm_ostree_path = \"/opt/bin/rpm-ostree\"").unwrap();
        let runner = Arc::new(MockRunner::new().without_binaries().respond(77, "", ""));

        let payload = execute(r#"{"name": "htop"}"#, &config, Box::new(Arc::clone(&runner)));

        assert!(!payload.failed);
        assert_eq!(runner.runs()[0].argv[0], "/opt/bin/rpm-ostree");
    }

    #[test]
    fn test_read_args_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "htop"}}"#).unwrap();

        let content = read_args(Some(file.path())).unwrap();
        assert_eq!(content, r#"{"name": "htop"}"#);
    }

    #[test]
    fn test_read_missing_args_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_args(Some(&dir.path().join("args.json"))).unwrap_err();
        assert!(err.to_string().contains("Could not read module arguments"));
    }
}
